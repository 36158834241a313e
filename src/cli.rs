// ============================================================================
// MontageFE CLI — headless canonical compositing via command-line arguments
// ============================================================================
//
// Usage examples:
//   montagefe --base mockup.png --design logo.png --output out.png
//   montagefe -b mockup.png -d logo.png --scale 20 --rotation 90 -o out.png
//   montagefe -b mockup.jpg -o flat.png                (no design: re-encode)
//
// No GUI is opened in CLI mode. The composite runs synchronously on the
// current thread and is written as PNG at the base image's native resolution.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use crate::io::{load_image_file, save_png_file};
use crate::montage::{TransformParameters, compose};

/// MontageFE headless compositor.
///
/// Flatten a design graphic onto a base mockup photo without opening the GUI.
#[derive(Parser, Debug)]
#[command(
    name = "montagefe",
    about = "MontageFE headless mockup compositor",
    long_about = "Composite a design graphic onto a base product photo at the base\n\
                  image's native resolution, using the same placement model as the\n\
                  interactive preview. Output is always PNG.\n\n\
                  Example:\n  \
                  montagefe --base mockup.png --design logo.png --scale 20 \\\n           \
                  --pos-x 50 --pos-y 42 --rotation 12 --output result.png"
)]
pub struct CliArgs {
    /// Base product photo (PNG, JPEG, WEBP or BMP).
    #[arg(short, long, required = true, value_name = "FILE")]
    pub base: PathBuf,

    /// Design graphic to overlay. When omitted the base is re-encoded as-is.
    #[arg(short, long, value_name = "FILE")]
    pub design: Option<PathBuf>,

    /// Output PNG path.
    #[arg(short, long, required = true, value_name = "FILE")]
    pub output: PathBuf,

    /// Horizontal design centre, percent of base width (0–100).
    #[arg(long, default_value_t = 50.0, value_name = "PCT")]
    pub pos_x: f32,

    /// Vertical design centre, percent of base height (0–100).
    #[arg(long, default_value_t = 50.0, value_name = "PCT")]
    pub pos_y: f32,

    /// Design width, percent of base width (1–100).
    #[arg(short, long, default_value_t = crate::montage::DEFAULT_SCALE, value_name = "PCT")]
    pub scale: f32,

    /// Clockwise rotation in degrees (−180..180).
    #[arg(short, long, default_value_t = 0.0, value_name = "DEG")]
    pub rotation: f32,

    /// Design layer opacity, percent (0–100).
    #[arg(long, default_value_t = 100.0, value_name = "PCT")]
    pub opacity: f32,

    /// Horizontal perspective shear in degrees (−45..45).
    #[arg(long, default_value_t = 0.0, value_name = "DEG")]
    pub perspective_x: f32,

    /// Vertical perspective shear in degrees (−45..45).
    #[arg(long, default_value_t = 0.0, value_name = "DEG")]
    pub perspective_y: f32,

    /// Print timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process
    /// arguments. Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--base" || a == "-b")
    }

    fn transform(&self) -> TransformParameters {
        TransformParameters {
            position_x: self.pos_x,
            position_y: self.pos_y,
            scale: self.scale,
            rotation: self.rotation,
            opacity: self.opacity,
            perspective_x: self.perspective_x,
            perspective_y: self.perspective_y,
        }
        .clamped()
    }
}

/// Run the headless composite. Returns the OS exit code:
/// `0` on success, `1` on any failure.
pub fn run(args: CliArgs) -> i32 {
    let started = Instant::now();

    let base = match load_image_file(&args.base) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("error: base image {}: {}", args.base.display(), e);
            return 1;
        }
    };

    let design = match &args.design {
        Some(path) => match load_image_file(path) {
            Ok(img) => Some(img),
            Err(e) => {
                eprintln!("error: design image {}: {}", path.display(), e);
                return 1;
            }
        },
        None => None,
    };

    let params = args.transform();
    let Some(result) = compose(Some(&base), design.as_ref(), &params) else {
        // Unreachable with a decoded base, but do not panic on it.
        eprintln!("error: nothing to composite");
        return 1;
    };

    if let Err(e) = save_png_file(&result, &args.output) {
        eprintln!("error: writing {}: {}", args.output.display(), e);
        return 1;
    }

    if args.verbose {
        println!(
            "{} ({}x{}) composited in {:.1?}",
            args.output.display(),
            result.width(),
            result.height(),
            started.elapsed()
        );
    }
    0
}
