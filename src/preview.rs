// ============================================================================
// INTERACTIVE PREVIEW — on-screen proxy of the canonical composite
// ============================================================================
//
// Renders the design over the base inside whatever rectangle the layout
// grants, using the exact placement maths of the canonical compositor at
// preview scale, and turns pointer drags into position updates. The widget
// never mutates the parameters itself: the new position is handed back to
// the caller, which owns the single `TransformParameters` value.

use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2};
use image::RgbaImage;

use crate::montage::{
    PlacementTransform, RenderedBaseDimensions, TransformParameters, drag_position, fit_within,
    target_size,
};

/// What the preview reports back after a frame.
pub struct PreviewResponse {
    /// Set while a drag gesture moves the design; the caller writes this
    /// into its transform parameters.
    pub new_position: Option<(f32, f32)>,
    /// Current on-screen size of the base image, if one is shown.
    pub rendered: Option<RenderedBaseDimensions>,
}

struct DragState {
    start: Pos2,
    initial: (f32, f32),
}

/// Retained preview state: cached GPU textures and the in-flight drag.
#[derive(Default)]
pub struct MontagePreview {
    base_tex: Option<TextureHandle>,
    base_tex_generation: u64,
    design_tex: Option<TextureHandle>,
    design_tex_generation: u64,
    rendered: Option<RenderedBaseDimensions>,
    drag: Option<DragState>,
}

impl MontagePreview {
    /// Draw one frame of the preview. `base_generation` / `design_generation`
    /// are bumped by the caller whenever the corresponding image is replaced,
    /// so textures are re-uploaded only on an actual swap, never per frame.
    ///
    /// The rendered base size is recomputed from the fitted rect every frame;
    /// container resizes, image swaps and orientation changes all flow
    /// through the same recomputation, which is idempotent by construction.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        base: Option<&RgbaImage>,
        base_generation: u64,
        design: Option<&RgbaImage>,
        design_generation: u64,
        params: &TransformParameters,
    ) -> PreviewResponse {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::hover());
        let canvas_rect = response.rect;

        let Some(base) = base else {
            self.rendered = None;
            self.drag = None;
            painter.text(
                canvas_rect.center(),
                egui::Align2::CENTER_CENTER,
                if design.is_some() {
                    "Load a base mockup to start placing the design"
                } else {
                    "Load a base mockup and a design graphic"
                },
                egui::FontId::proportional(16.0),
                ui.visuals().weak_text_color(),
            );
            return PreviewResponse {
                new_position: None,
                rendered: None,
            };
        };

        let base_tex = ensure_texture(
            ui,
            &mut self.base_tex,
            &mut self.base_tex_generation,
            base_generation,
            base,
            "montage-preview-base",
        );

        // Contain-fit the base into the canvas; the fitted rect IS the
        // RenderedBaseDimensions every percentage is measured against.
        let (fit_w, fit_h) = fit_within(
            canvas_rect.width(),
            canvas_rect.height(),
            base.width() as f32,
            base.height() as f32,
        );
        let base_rect = Rect::from_center_size(canvas_rect.center(), Vec2::new(fit_w, fit_h));
        let rendered = RenderedBaseDimensions {
            width: fit_w,
            height: fit_h,
        };
        self.rendered = Some(rendered);

        painter.image(
            base_tex,
            base_rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );

        let mut new_position = None;

        if let Some(design) = design
            && design.width() > 0
            && fit_w > 0.0
        {
            let design_tex = ensure_texture(
                ui,
                &mut self.design_tex,
                &mut self.design_tex_generation,
                design_generation,
                design,
                "montage-preview-design",
            );

            let p = params.clamped();
            let (tw, th) = target_size(fit_w, design.width() as f32, design.height() as f32, p.scale);

            // Same translate → shear → rotate order as the canonical
            // compositor, evaluated at preview scale.
            let xform = PlacementTransform::new(&p, fit_w, fit_h);
            let corners = xform.corners(tw, th);
            let to_screen =
                |c: (f32, f32)| Pos2::new(base_rect.min.x + c.0, base_rect.min.y + c.1);

            let alpha = (p.opacity / 100.0 * 255.0).round() as u8;
            let tint = Color32::from_white_alpha(alpha);
            let uvs = [
                Pos2::new(0.0, 0.0),
                Pos2::new(1.0, 0.0),
                Pos2::new(1.0, 1.0),
                Pos2::new(0.0, 1.0),
            ];

            let mut mesh = egui::Mesh::with_texture(design_tex);
            for (corner, uv) in corners.iter().zip(uvs) {
                mesh.vertices.push(egui::epaint::Vertex {
                    pos: to_screen(*corner),
                    uv,
                    color: tint,
                });
            }
            mesh.add_triangle(0, 1, 2);
            mesh.add_triangle(0, 2, 3);
            painter.add(egui::Shape::mesh(mesh));

            // Interact over the quad's bounding box, but arm the drag (and
            // show the grab cursor) only when the pointer is on the quad
            // itself; under rotation or shear the box overhangs empty corners.
            let mut quad_rect = Rect::NOTHING;
            for corner in &corners {
                quad_rect.extend_with(to_screen(*corner));
            }
            let on_design = |pos: Pos2| {
                xform.contains((pos.x - base_rect.min.x, pos.y - base_rect.min.y), tw, th)
            };
            let drag_response = ui.interact(
                quad_rect.intersect(canvas_rect),
                ui.id().with("montage-design-drag"),
                Sense::drag(),
            );
            let hovering_design = drag_response.hover_pos().is_some_and(|p| on_design(p));
            if hovering_design || self.drag.is_some() {
                ui.ctx().set_cursor_icon(if self.drag.is_some() {
                    egui::CursorIcon::Grabbing
                } else {
                    egui::CursorIcon::Grab
                });
            }

            if drag_response.drag_started()
                && let Some(pos) = drag_response.interact_pointer_pos()
                && on_design(pos)
            {
                self.drag = Some(DragState {
                    start: pos,
                    initial: (p.position_x, p.position_y),
                });
            }
            if drag_response.dragged()
                && let Some(drag) = &self.drag
                && let Some(pos) = drag_response.interact_pointer_pos()
            {
                let delta = (pos.x - drag.start.x, pos.y - drag.start.y);
                new_position = Some(drag_position(
                    drag.initial.0,
                    drag.initial.1,
                    delta,
                    rendered,
                ));
            }
            if drag_response.drag_released() {
                self.drag = None;
            }
        } else {
            self.drag = None;
        }

        PreviewResponse {
            new_position,
            rendered: Some(rendered),
        }
    }
}

/// Upload (or re-upload) an image into a cached texture. Reuses the existing
/// `TextureHandle` via `tex.set` when the image was merely replaced, avoiding
/// allocation churn on swaps.
fn ensure_texture(
    ui: &egui::Ui,
    slot: &mut Option<TextureHandle>,
    slot_generation: &mut u64,
    generation: u64,
    img: &RgbaImage,
    name: &'static str,
) -> egui::TextureId {
    let options = TextureOptions {
        magnification: egui::TextureFilter::Linear,
        minification: egui::TextureFilter::Linear,
        ..Default::default()
    };
    match slot {
        Some(tex) => {
            if *slot_generation != generation {
                tex.set(upload_image(img), options);
                *slot_generation = generation;
            }
            tex.id()
        }
        None => {
            let tex = ui.ctx().load_texture(name, upload_image(img), options);
            let id = tex.id();
            *slot = Some(tex);
            *slot_generation = generation;
            id
        }
    }
}

fn upload_image(img: &RgbaImage) -> ColorImage {
    ColorImage::from_rgba_unmultiplied([img.width() as usize, img.height() as usize], img.as_raw())
}
