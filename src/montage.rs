// ============================================================================
// MONTAGE CORE — transform parameters, placement geometry, canonical compositor
// ============================================================================
//
// The single source of truth for design placement. Both the interactive
// preview (preview.rs) and the canonical compositor below consume the same
// `TransformParameters` value, so the on-screen proxy and the flattened
// output can never disagree on geometry.

use image::RgbaImage;
use rayon::prelude::*;

/// Scale applied whenever a new design graphic is loaded (percent of base width).
pub const DEFAULT_SCALE: f32 = 35.0;

/// User-adjustable placement of the design graphic on the base image.
///
/// All fields are percentages or degrees relative to the *base image's own*
/// dimensions — never the preview container — which is what keeps the preview
/// and the canonical output in agreement at any display zoom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformParameters {
    /// Horizontal centre of the design, percent of base width (0–100).
    pub position_x: f32,
    /// Vertical centre of the design, percent of base height (0–100).
    pub position_y: f32,
    /// Rendered design width, percent of base width (1–100). Height follows
    /// the design's native aspect ratio.
    pub scale: f32,
    /// Clockwise rotation about the design centre, degrees (−180..180).
    pub rotation: f32,
    /// Uniform layer opacity, percent (0–100).
    pub opacity: f32,
    /// Horizontal shear angle, degrees (−45..45).
    pub perspective_x: f32,
    /// Vertical shear angle, degrees (−45..45).
    pub perspective_y: f32,
}

impl Default for TransformParameters {
    fn default() -> Self {
        Self {
            position_x: 50.0,
            position_y: 50.0,
            scale: DEFAULT_SCALE,
            rotation: 0.0,
            opacity: 100.0,
            perspective_x: 0.0,
            perspective_y: 0.0,
        }
    }
}

impl TransformParameters {
    /// Return a copy with every field forced into its documented range.
    ///
    /// The UI clamps at the control level too, but the compositor never
    /// trusts its input: out-of-range values must degrade to the nearest
    /// legal placement, not crash or draw garbage.
    pub fn clamped(&self) -> Self {
        Self {
            position_x: self.position_x.clamp(0.0, 100.0),
            position_y: self.position_y.clamp(0.0, 100.0),
            scale: self.scale.clamp(1.0, 100.0),
            rotation: self.rotation.clamp(-180.0, 180.0),
            opacity: self.opacity.clamp(0.0, 100.0),
            perspective_x: self.perspective_x.clamp(-45.0, 45.0),
            perspective_y: self.perspective_y.clamp(-45.0, 45.0),
        }
    }

    /// Parameter reset when a new design is loaded: scale returns to its
    /// default, everything else persists across the swap.
    pub fn reset_for_new_design(&mut self) {
        self.scale = DEFAULT_SCALE;
    }
}

// ---------------------------------------------------------------------------
//  Shared placement geometry
// ---------------------------------------------------------------------------

/// On-screen pixel size at which the base image is currently displayed.
/// Derived state, recomputed whenever the preview surface or the base image
/// changes; never consumed by the canonical compositor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderedBaseDimensions {
    pub width: f32,
    pub height: f32,
}

/// Aspect-preserving design box: width is `scale` percent of the base width,
/// height follows the design's native proportions.
pub fn target_size(base_w: f32, design_w: f32, design_h: f32, scale: f32) -> (f32, f32) {
    let tw = base_w * (scale / 100.0);
    let th = if design_w > 0.0 { design_h * (tw / design_w) } else { 0.0 };
    (tw, th)
}

/// Contain-fit an image into a container, preserving aspect ratio.
/// Returns the rendered size (≤ container on both axes, exact on one).
pub fn fit_within(container_w: f32, container_h: f32, image_w: f32, image_h: f32) -> (f32, f32) {
    if image_w <= 0.0 || image_h <= 0.0 || container_w <= 0.0 || container_h <= 0.0 {
        return (0.0, 0.0);
    }
    let s = (container_w / image_w).min(container_h / image_h);
    (image_w * s, image_h * s)
}

/// Drag gesture maths: convert a pointer delta (preview pixels) into a new
/// clamped position. `initial` is the position captured at drag start, so
/// repeated deltas from the same gesture never accumulate rounding error.
pub fn drag_position(
    initial_x: f32,
    initial_y: f32,
    delta_px: (f32, f32),
    rendered: RenderedBaseDimensions,
) -> (f32, f32) {
    if rendered.width <= 0.0 || rendered.height <= 0.0 {
        return (initial_x, initial_y);
    }
    let dx = delta_px.0 / rendered.width * 100.0;
    let dy = delta_px.1 / rendered.height * 100.0;
    ((initial_x + dx).clamp(0.0, 100.0), (initial_y + dy).clamp(0.0, 100.0))
}

/// Forward placement transform: maps a point in the design's local frame
/// (origin at the design centre) to base-image coordinates. Order is
/// translate → shear → rotate, identical in the preview mesh and the
/// compositor's inverse mapping; changing it is a visible defect.
#[derive(Clone, Copy, Debug)]
pub struct PlacementTransform {
    /// Design centre in target coordinates.
    pub centre: (f32, f32),
    // Row-major 2×2 of shear·rotation.
    m00: f32,
    m01: f32,
    m10: f32,
    m11: f32,
}

impl PlacementTransform {
    /// Build the transform for a base surface of `base_w`×`base_h` pixels
    /// (or preview points — the maths is unit-agnostic).
    pub fn new(params: &TransformParameters, base_w: f32, base_h: f32) -> Self {
        let p = params.clamped();
        let centre = (p.position_x / 100.0 * base_w, p.position_y / 100.0 * base_h);

        let kx = p.perspective_x.to_radians().tan();
        let ky = p.perspective_y.to_radians().tan();
        // Clockwise rotation in y-down screen coordinates.
        let (sin, cos) = p.rotation.to_radians().sin_cos();

        // S·R with S = [[1, kx], [ky, 1]] and R = [[cos, -sin], [sin, cos]].
        Self {
            centre,
            m00: cos + kx * sin,
            m01: -sin + kx * cos,
            m10: ky * cos + sin,
            m11: -ky * sin + cos,
        }
    }

    /// Map a design-local point to target coordinates.
    pub fn apply(&self, local: (f32, f32)) -> (f32, f32) {
        (
            self.centre.0 + self.m00 * local.0 + self.m01 * local.1,
            self.centre.1 + self.m10 * local.0 + self.m11 * local.1,
        )
    }

    /// Map a target point back into the design-local frame.
    /// `None` when the matrix is singular (only reachable at the extreme
    /// ±45°/±45° shear corner where the quad collapses to a line).
    pub fn invert(&self, point: (f32, f32)) -> Option<(f32, f32)> {
        let det = self.m00 * self.m11 - self.m01 * self.m10;
        if det.abs() < 1e-6 {
            return None;
        }
        let inv = 1.0 / det;
        let px = point.0 - self.centre.0;
        let py = point.1 - self.centre.1;
        Some((
            (self.m11 * px - self.m01 * py) * inv,
            (-self.m10 * px + self.m00 * py) * inv,
        ))
    }

    /// Whether a target point lands on a `w`×`h` design box centred on the
    /// local origin. Tighter than the transformed quad's bounding box under
    /// rotation or shear. A singular transform contains nothing.
    pub fn contains(&self, point: (f32, f32), w: f32, h: f32) -> bool {
        match self.invert(point) {
            Some((lx, ly)) => lx.abs() <= w * 0.5 && ly.abs() <= h * 0.5,
            None => false,
        }
    }

    /// The four corners of a `w`×`h` design box centred on the local origin,
    /// mapped to target coordinates (top-left, top-right, bottom-right,
    /// bottom-left).
    pub fn corners(&self, w: f32, h: f32) -> [(f32, f32); 4] {
        let hw = w * 0.5;
        let hh = h * 0.5;
        [
            self.apply((-hw, -hh)),
            self.apply((hw, -hh)),
            self.apply((hw, hh)),
            self.apply((-hw, hh)),
        ]
    }
}

// ---------------------------------------------------------------------------
//  Canonical compositor
// ---------------------------------------------------------------------------

/// Flatten base + design into a single raster at the base image's native
/// resolution. Deterministic: identical inputs always produce byte-identical
/// output (no randomness, no timestamps, and the rayon rows are independent).
///
/// * No base → `None` ("nothing to composite yet" is a normal empty state).
/// * No design → a copy of the base, unchanged.
///
/// The design is drawn by inverse mapping: for every output pixel inside the
/// transformed quad's bounding box, map back into the design frame and
/// bilinear-sample against a transparent border, then blend source-over with
/// the uniform layer opacity.
pub fn compose(
    base: Option<&RgbaImage>,
    design: Option<&RgbaImage>,
    params: &TransformParameters,
) -> Option<RgbaImage> {
    let base = base?;
    let mut out = base.clone();

    let Some(design) = design else {
        return Some(out);
    };
    if design.width() == 0 || design.height() == 0 {
        return Some(out);
    }

    let p = params.clamped();
    let base_w = out.width();
    let base_h = out.height();

    let (tw, th) = target_size(
        base_w as f32,
        design.width() as f32,
        design.height() as f32,
        p.scale,
    );
    if tw < 1.0 || th < 1.0 {
        return Some(out);
    }

    let xform = PlacementTransform::new(&p, base_w as f32, base_h as f32);
    let layer_alpha = p.opacity / 100.0;
    if layer_alpha <= 0.0 {
        return Some(out);
    }

    // Row range actually covered by the transformed quad, so a small design
    // on a large base doesn't walk the whole canvas.
    let corners = xform.corners(tw, th);
    let min_y = corners
        .iter()
        .map(|c| c.1)
        .fold(f32::INFINITY, f32::min)
        .floor()
        .max(0.0) as u32;
    let max_y = corners
        .iter()
        .map(|c| c.1)
        .fold(f32::NEG_INFINITY, f32::max)
        .ceil()
        .min(base_h as f32) as u32;
    let min_x = corners
        .iter()
        .map(|c| c.0)
        .fold(f32::INFINITY, f32::min)
        .floor()
        .max(0.0) as u32;
    let max_x = corners
        .iter()
        .map(|c| c.0)
        .fold(f32::NEG_INFINITY, f32::max)
        .ceil()
        .min(base_w as f32) as u32;
    if min_y >= max_y || min_x >= max_x {
        return Some(out);
    }

    // Design sampling scale: local design-box units → native design pixels.
    let sx_scale = design.width() as f32 / tw;
    let sy_scale = design.height() as f32 / th;
    let half_w = tw * 0.5;
    let half_h = th * 0.5;

    let design_w = design.width() as i32;
    let design_h = design.height() as i32;
    let design_stride = design_w as usize * 4;
    let design_raw = design.as_raw();

    let row_bytes = base_w as usize * 4;
    let out_raw = out.as_mut();

    // Process output rows in parallel using rayon; skip rows outside the quad.
    out_raw
        .par_chunks_mut(row_bytes)
        .enumerate()
        .skip(min_y as usize)
        .take((max_y - min_y) as usize)
        .for_each(|(dy, row)| {
            for dx in min_x..max_x {
                let Some((lx, ly)) = xform.invert((dx as f32, dy as f32)) else {
                    return; // singular transform: nothing to draw anywhere
                };

                // Local design-box coordinates with origin at the top-left.
                let u = lx + half_w;
                let v = ly + half_h;
                if u < -1.0 || v < -1.0 || u > tw || v > th {
                    continue;
                }

                let src_x = u * sx_scale;
                let src_y = v * sy_scale;
                let x0 = src_x.floor() as i32;
                let y0 = src_y.floor() as i32;
                if x0 < -1 || y0 < -1 || x0 >= design_w || y0 >= design_h {
                    continue;
                }
                let fx = src_x - x0 as f32;
                let fy = src_y - y0 as f32;

                let sample = |sx: i32, sy: i32| -> [f32; 4] {
                    if sx < 0 || sy < 0 || sx >= design_w || sy >= design_h {
                        [0.0; 4]
                    } else {
                        let idx = sy as usize * design_stride + sx as usize * 4;
                        [
                            design_raw[idx] as f32,
                            design_raw[idx + 1] as f32,
                            design_raw[idx + 2] as f32,
                            design_raw[idx + 3] as f32,
                        ]
                    }
                };

                let tl = sample(x0, y0);
                let tr = sample(x0 + 1, y0);
                let bl = sample(x0, y0 + 1);
                let br = sample(x0 + 1, y0 + 1);

                let mut src = [0.0f32; 4];
                for c in 0..4 {
                    let top = tl[c] + (tr[c] - tl[c]) * fx;
                    let bot = bl[c] + (br[c] - bl[c]) * fx;
                    src[c] = top + (bot - top) * fy;
                }

                let px = dx as usize * 4;
                let dst = [
                    row[px] as f32,
                    row[px + 1] as f32,
                    row[px + 2] as f32,
                    row[px + 3] as f32,
                ];
                let blended = blend_over(dst, src, layer_alpha);
                row[px] = blended[0];
                row[px + 1] = blended[1];
                row[px + 2] = blended[2];
                row[px + 3] = blended[3];
            }
        });

    Some(out)
}

/// Normal source-over blend of a design sample onto a base pixel, with a
/// uniform layer opacity multiplied into the source alpha. Channels in 0–255.
fn blend_over(base: [f32; 4], top: [f32; 4], opacity: f32) -> [u8; 4] {
    let top_a = (top[3] / 255.0) * opacity;
    if top_a <= 0.0 {
        return [base[0] as u8, base[1] as u8, base[2] as u8, base[3] as u8];
    }

    let base_a = base[3] / 255.0;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (top[c] * top_a + base[c] * base_a * (1.0 - top_a)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgba;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    const GRAY: [u8; 4] = [128, 128, 128, 255];
    const RED: [u8; 4] = [255, 0, 0, 255];

    fn centred_params(scale: f32) -> TransformParameters {
        TransformParameters {
            scale,
            ..TransformParameters::default()
        }
    }

    #[test]
    fn missing_base_yields_no_output() {
        let design = solid(10, 10, RED);
        let params = TransformParameters::default();
        assert!(compose(None, Some(&design), &params).is_none());
        assert!(compose(None, None, &params).is_none());
    }

    #[test]
    fn missing_design_passes_base_through() {
        let base = solid(64, 48, GRAY);
        let out = compose(Some(&base), None, &TransformParameters::default()).unwrap();
        assert_eq!(out.as_raw(), base.as_raw());
    }

    #[test]
    fn compose_is_deterministic() {
        let base = solid(200, 200, GRAY);
        let design = solid(40, 20, RED);
        let params = TransformParameters {
            position_x: 37.0,
            position_y: 61.0,
            scale: 42.0,
            rotation: 28.5,
            opacity: 73.0,
            perspective_x: 12.0,
            perspective_y: -9.0,
        };
        let a = compose(Some(&base), Some(&design), &params).unwrap();
        let b = compose(Some(&base), Some(&design), &params).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    // End-to-end: 1000×1000 gray base, 200×100 red design, neutral transform
    // at 20% scale → axis-aligned red rectangle spanning x∈[400,600), y∈[450,550).
    #[test]
    fn identity_placement_centres_design() {
        let base = solid(1000, 1000, GRAY);
        let design = solid(200, 100, RED);
        let params = centred_params(20.0);
        let out = compose(Some(&base), Some(&design), &params).unwrap();

        for (x, y) in [(400, 450), (599, 450), (400, 549), (599, 549), (500, 500)] {
            assert_eq!(out.get_pixel(x, y).0, RED, "expected red at ({x},{y})");
        }
        for (x, y) in [(399, 500), (601, 500), (500, 448), (500, 551), (0, 0), (999, 999)] {
            assert_eq!(out.get_pixel(x, y).0, GRAY, "expected gray at ({x},{y})");
        }
    }

    #[test]
    fn rotation_90_swaps_the_long_axis() {
        let base = solid(1000, 1000, GRAY);
        let design = solid(200, 100, RED);
        let params = TransformParameters {
            rotation: 90.0,
            ..centred_params(20.0)
        };
        let out = compose(Some(&base), Some(&design), &params).unwrap();

        // Long axis now vertical: x∈[450,550), y∈[400,600).
        assert_eq!(out.get_pixel(500, 410).0, RED);
        assert_eq!(out.get_pixel(500, 590).0, RED);
        assert_eq!(out.get_pixel(460, 500).0, RED);
        assert_eq!(out.get_pixel(540, 500).0, RED);
        assert_eq!(out.get_pixel(500, 500).0, RED);
        assert_eq!(out.get_pixel(400, 500).0, GRAY);
        assert_eq!(out.get_pixel(600, 500).0, GRAY);
        assert_eq!(out.get_pixel(500, 395).0, GRAY);
        assert_eq!(out.get_pixel(500, 605).0, GRAY);
    }

    #[test]
    fn rotation_preserves_the_centroid() {
        let base = solid(1000, 1000, GRAY);
        let design = solid(200, 100, RED);
        let params = TransformParameters {
            rotation: 37.0,
            ..centred_params(20.0)
        };
        let out = compose(Some(&base), Some(&design), &params).unwrap();

        // Centroid of reddish pixels (ignoring anti-aliased edges) stays put.
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        let mut n = 0.0f64;
        for (x, y, px) in out.enumerate_pixels() {
            if px[0] > 200 && px[1] < 60 {
                sum_x += x as f64;
                sum_y += y as f64;
                n += 1.0;
            }
        }
        assert!(n > 1000.0, "rotated design should still cover many pixels");
        assert_relative_eq!(sum_x / n, 500.0, epsilon = 2.0);
        assert_relative_eq!(sum_y / n, 500.0, epsilon = 2.0);
    }

    #[test]
    fn opacity_blends_linearly() {
        let base = solid(1000, 1000, GRAY);
        let design = solid(200, 100, RED);

        // opacity 0 → base untouched
        let params = TransformParameters {
            opacity: 0.0,
            ..centred_params(20.0)
        };
        let out = compose(Some(&base), Some(&design), &params).unwrap();
        assert_eq!(out.as_raw(), base.as_raw());

        // opacity 100 → pure design colour inside the rectangle
        let params = centred_params(20.0);
        let out = compose(Some(&base), Some(&design), &params).unwrap();
        assert_eq!(out.get_pixel(500, 500).0, RED);

        // opacity 50 → the 50/50 blend of red and gray, not pure red
        let params = TransformParameters {
            opacity: 50.0,
            ..centred_params(20.0)
        };
        let out = compose(Some(&base), Some(&design), &params).unwrap();
        let px = out.get_pixel(500, 500).0;
        let expect_r = (255.0f32 * 0.5 + 128.0 * 0.5).round() as i32;
        let expect_g = (0.0f32 * 0.5 + 128.0 * 0.5).round() as i32;
        assert!((px[0] as i32 - expect_r).abs() <= 1, "r = {}", px[0]);
        assert!((px[1] as i32 - expect_g).abs() <= 1, "g = {}", px[1]);
        assert!((px[2] as i32 - expect_g).abs() <= 1, "b = {}", px[2]);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn design_alpha_multiplies_with_layer_opacity() {
        let base = solid(100, 100, GRAY);
        // Design at 50% intrinsic alpha, layer at 50% → effective 25%.
        let design = solid(20, 20, [255, 0, 0, 128]);
        let params = TransformParameters {
            opacity: 50.0,
            ..centred_params(20.0)
        };
        let out = compose(Some(&base), Some(&design), &params).unwrap();
        let px = out.get_pixel(50, 50).0;
        let eff = (128.0f32 / 255.0) * 0.5;
        let expect_r = (255.0 * eff + 128.0 * (1.0 - eff)).round() as i32;
        assert!((px[0] as i32 - expect_r).abs() <= 1, "r = {}", px[0]);
    }

    #[test]
    fn shear_keeps_the_centre_pixel() {
        let base = solid(1000, 1000, GRAY);
        let design = solid(200, 100, RED);
        let params = TransformParameters {
            perspective_x: 25.0,
            perspective_y: -15.0,
            ..centred_params(20.0)
        };
        let out = compose(Some(&base), Some(&design), &params).unwrap();
        assert_eq!(out.get_pixel(500, 500).0, RED);
    }

    #[test]
    fn extreme_shear_corner_degrades_to_base() {
        // tan(45°)·tan(45°) = 1 makes the shear singular; the compositor
        // must return the base unchanged instead of dividing by zero.
        let base = solid(100, 100, GRAY);
        let design = solid(20, 20, RED);
        let params = TransformParameters {
            perspective_x: 45.0,
            perspective_y: 45.0,
            ..centred_params(20.0)
        };
        let out = compose(Some(&base), Some(&design), &params).unwrap();
        assert_eq!(out.as_raw(), base.as_raw());
    }

    #[test]
    fn out_of_range_parameters_are_clamped() {
        let base = solid(100, 100, GRAY);
        let design = solid(10, 10, RED);
        let wild = TransformParameters {
            position_x: 250.0,
            position_y: -40.0,
            scale: 1000.0,
            rotation: 720.0,
            opacity: 300.0,
            perspective_x: 90.0,
            perspective_y: -90.0,
        };
        let clamped = wild.clamped();
        let out_wild = compose(Some(&base), Some(&design), &wild).unwrap();
        let out_clamped = compose(Some(&base), Some(&design), &clamped).unwrap();
        assert_eq!(out_wild.as_raw(), out_clamped.as_raw());
        assert_eq!(clamped.position_x, 100.0);
        assert_eq!(clamped.position_y, 0.0);
        assert_eq!(clamped.scale, 100.0);
        assert_eq!(clamped.rotation, 180.0);
        assert_eq!(clamped.opacity, 100.0);
        assert_eq!(clamped.perspective_x, 45.0);
        assert_eq!(clamped.perspective_y, -45.0);
    }

    #[test]
    fn target_size_preserves_aspect_ratio() {
        for scale in [1.0, 17.0, 35.0, 50.0, 100.0] {
            let (tw, th) = target_size(1024.0, 640.0, 400.0, scale);
            assert_relative_eq!(th / tw, 400.0 / 640.0, epsilon = 1e-5);
            assert_relative_eq!(tw, 1024.0 * scale / 100.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn fit_within_contains_and_preserves_aspect() {
        let (w, h) = fit_within(800.0, 600.0, 1000.0, 1000.0);
        assert_relative_eq!(w, 600.0);
        assert_relative_eq!(h, 600.0);

        let (w, h) = fit_within(800.0, 600.0, 1600.0, 400.0);
        assert_relative_eq!(w, 800.0);
        assert_relative_eq!(h, 200.0);

        assert_eq!(fit_within(800.0, 600.0, 0.0, 10.0), (0.0, 0.0));
    }

    // Scale is defined against the base image, so two different preview sizes
    // must show the design covering the same fraction of the base.
    #[test]
    fn preview_scale_is_size_independent() {
        let params = centred_params(35.0);
        for rendered_w in [320.0, 1280.0] {
            let (tw, _) = target_size(rendered_w, 200.0, 100.0, params.scale);
            assert_relative_eq!(tw / rendered_w, 0.35, epsilon = 1e-5);
        }
    }

    #[test]
    fn drag_converts_pixels_to_percent_and_clamps() {
        let rendered = RenderedBaseDimensions {
            width: 400.0,
            height: 200.0,
        };
        // 40 px right on a 400 px preview = +10%.
        let (x, y) = drag_position(50.0, 50.0, (40.0, -20.0), rendered);
        assert_relative_eq!(x, 60.0);
        assert_relative_eq!(y, 40.0);

        // Dragging far outside pins to exactly 0 / 100, never beyond.
        let (x, y) = drag_position(50.0, 50.0, (10_000.0, -10_000.0), rendered);
        assert_eq!((x, y), (100.0, 0.0));
    }

    #[test]
    fn placement_round_trips_through_inverse() {
        let params = TransformParameters {
            position_x: 30.0,
            position_y: 70.0,
            rotation: -64.0,
            perspective_x: 18.0,
            perspective_y: -7.0,
            ..centred_params(40.0)
        };
        let xform = PlacementTransform::new(&params, 1000.0, 800.0);
        for local in [(0.0, 0.0), (-50.0, 25.0), (120.0, -80.0)] {
            let world = xform.apply(local);
            let back = xform.invert(world).unwrap();
            assert_relative_eq!(back.0, local.0, epsilon = 1e-3);
            assert_relative_eq!(back.1, local.1, epsilon = 1e-3);
        }
    }

    #[test]
    fn contains_follows_the_rotated_quad_not_its_bounding_box() {
        // 500×500 design rotated 45° about the image centre.
        let params = TransformParameters {
            rotation: 45.0,
            ..centred_params(50.0)
        };
        let xform = PlacementTransform::new(&params, 1000.0, 1000.0);

        assert!(xform.contains((500.0, 500.0), 500.0, 500.0));
        // On the vertical axis the rotated quad reaches out to ~353 px.
        assert!(xform.contains((500.0, 800.0), 500.0, 500.0));
        // Inside the axis-aligned bounding box but past the 45° edge.
        assert!(!xform.contains((740.0, 740.0), 500.0, 500.0));

        // Collapsed quad at the singular shear corner contains nothing.
        let singular = TransformParameters {
            perspective_x: 45.0,
            perspective_y: 45.0,
            ..centred_params(50.0)
        };
        let xform = PlacementTransform::new(&singular, 1000.0, 1000.0);
        assert!(!xform.contains((500.0, 500.0), 500.0, 500.0));
    }

    #[test]
    fn reset_for_new_design_only_touches_scale() {
        let mut params = TransformParameters {
            position_x: 20.0,
            position_y: 80.0,
            scale: 77.0,
            rotation: 45.0,
            opacity: 60.0,
            perspective_x: 10.0,
            perspective_y: -10.0,
        };
        params.reset_for_new_design();
        assert_eq!(params.scale, DEFAULT_SCALE);
        assert_eq!(params.position_x, 20.0);
        assert_eq!(params.rotation, 45.0);
        assert_eq!(params.opacity, 60.0);
    }
}
