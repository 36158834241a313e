// ============================================================================
// APPLICATION SHELL — control panel, preview, gallery glue
// ============================================================================

use std::collections::HashMap;

use eframe::egui;
use egui::{Color32, ColorImage, TextureHandle, TextureOptions};
use image::RgbaImage;

use crate::gallery::{Gallery, StoredImage};
use crate::io;
use crate::montage::{self, TransformParameters};
use crate::preview::MontagePreview;

/// Longest edge of a gallery thumbnail texture.
const THUMBNAIL_EDGE: u32 = 96;

/// A decoded source raster plus a generation counter so the preview knows
/// when to re-upload its texture. Images are replaced wholesale on upload or
/// gallery selection, never partially mutated.
struct LoadedImage {
    rgba: RgbaImage,
    generation: u64,
}

pub struct MontageApp {
    params: TransformParameters,
    base: Option<LoadedImage>,
    design: Option<LoadedImage>,
    next_generation: u64,

    preview: MontagePreview,
    gallery: Gallery,
    thumbnails: HashMap<String, TextureHandle>,

    status: Option<String>,
    error: Option<String>,
}

impl MontageApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            params: TransformParameters::default(),
            base: None,
            design: None,
            next_generation: 0,
            preview: MontagePreview::default(),
            gallery: Gallery::open_default(),
            thumbnails: HashMap::new(),
            status: None,
            error: None,
        }
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn set_base(&mut self, rgba: RgbaImage) {
        let generation = self.bump_generation();
        self.base = Some(LoadedImage { rgba, generation });
    }

    fn set_design(&mut self, rgba: RgbaImage) {
        let generation = self.bump_generation();
        self.design = Some(LoadedImage { rgba, generation });
        // New design: scale returns to its default, placement persists.
        self.params.reset_for_new_design();
    }

    fn report<T>(&mut self, result: Result<T, String>, ok_msg: &str) {
        match result {
            Ok(_) => {
                self.status = Some(ok_msg.to_string());
                self.error = None;
            }
            Err(e) => {
                log_err!("{}", e);
                self.error = Some(e);
                self.status = None;
            }
        }
    }

    fn load_base_from_dialog(&mut self) {
        let Some(path) = io::pick_image_file() else {
            return;
        };
        match io::load_image_file(&path) {
            Ok(img) => {
                log_info!("Loaded base image {:?} ({}x{})", path, img.width(), img.height());
                self.set_base(img);
                self.status = Some("Base mockup loaded".to_string());
                self.error = None;
            }
            Err(e) => {
                log_err!("Base load failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    fn load_design_from_dialog(&mut self) {
        let Some(path) = io::pick_image_file() else {
            return;
        };
        match io::load_image_file(&path) {
            Ok(img) => {
                log_info!("Loaded design image {:?} ({}x{})", path, img.width(), img.height());
                self.set_design(img);
                self.status = Some("Design graphic loaded".to_string());
                self.error = None;
            }
            Err(e) => {
                log_err!("Design load failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    /// Flatten the current montage at the base image's native resolution.
    /// `None` while no base is loaded — a normal empty state, not an error.
    fn compose_current(&self) -> Option<RgbaImage> {
        montage::compose(
            self.base.as_ref().map(|l| &l.rgba),
            self.design.as_ref().map(|l| &l.rgba),
            &self.params,
        )
    }

    fn save_composite_to_gallery(&mut self) {
        let Some(composite) = self.compose_current() else {
            self.error = Some("Load a base mockup first".to_string());
            return;
        };
        let result = io::encode_png(&composite)
            .map_err(|e| e.to_string())
            .and_then(|png| {
                self.gallery
                    .insert(StoredImage::new(png, "Manual montage"))
            });
        self.report(result, "Saved to gallery");
    }

    fn export_composite(&mut self) {
        let Some(composite) = self.compose_current() else {
            self.error = Some("Load a base mockup first".to_string());
            return;
        };
        let Some(path) = io::pick_save_file("montage.png") else {
            return;
        };
        let result = io::save_png_file(&composite, &path).map_err(|e| e.to_string());
        self.report(result, "Montage exported");
    }

    fn use_stored_as_base(&mut self, id: &str) {
        let Some(stored) = self.gallery.get(id) else {
            return;
        };
        match io::decode_image(&stored.png) {
            Ok(img) => {
                self.set_base(img);
                self.status = Some("Gallery image loaded as base".to_string());
                self.error = None;
            }
            Err(e) => {
                log_err!("Stored image {} undecodable: {}", id, e);
                self.error = Some(e.to_string());
            }
        }
    }

    fn thumbnail_for(&mut self, ctx: &egui::Context, stored: &StoredImage) -> Option<TextureHandle> {
        if let Some(tex) = self.thumbnails.get(&stored.id) {
            return Some(tex.clone());
        }
        let img = io::decode_image(&stored.png).ok()?;
        let (w, h) = montage::fit_within(
            THUMBNAIL_EDGE as f32,
            THUMBNAIL_EDGE as f32,
            img.width() as f32,
            img.height() as f32,
        );
        let thumb = image::imageops::thumbnail(&img, (w as u32).max(1), (h as u32).max(1));
        let color_image = ColorImage::from_rgba_unmultiplied(
            [thumb.width() as usize, thumb.height() as usize],
            thumb.as_raw(),
        );
        let tex = ctx.load_texture(
            format!("gallery-thumb-{}", stored.id),
            color_image,
            TextureOptions::default(),
        );
        self.thumbnails.insert(stored.id.clone(), tex.clone());
        Some(tex)
    }

    // -- panels --------------------------------------------------------------

    fn controls_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Montage");
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            if ui.button("Load base…").clicked() {
                self.load_base_from_dialog();
            }
            if ui.button("Load design…").clicked() {
                self.load_design_from_dialog();
            }
        });

        ui.separator();
        ui.label("Placement");
        ui.add(egui::Slider::new(&mut self.params.position_x, 0.0..=100.0).text("X").suffix("%"));
        ui.add(egui::Slider::new(&mut self.params.position_y, 0.0..=100.0).text("Y").suffix("%"));
        ui.add(egui::Slider::new(&mut self.params.scale, 1.0..=100.0).text("Scale").suffix("%"));
        ui.add(egui::Slider::new(&mut self.params.rotation, -180.0..=180.0).text("Rotation").suffix("°"));
        ui.add(egui::Slider::new(&mut self.params.opacity, 0.0..=100.0).text("Opacity").suffix("%"));

        ui.label("Perspective");
        ui.add(egui::Slider::new(&mut self.params.perspective_x, -45.0..=45.0).text("Tilt X").suffix("°"));
        ui.add(egui::Slider::new(&mut self.params.perspective_y, -45.0..=45.0).text("Tilt Y").suffix("°"));

        if ui.button("Reset placement").clicked() {
            self.params = TransformParameters::default();
        }

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Save to gallery").clicked() {
                self.save_composite_to_gallery();
            }
            if ui.button("Export PNG…").clicked() {
                self.export_composite();
            }
        });

        if self.design.is_some() && self.base.is_some() {
            ui.add_space(4.0);
            ui.weak("Drag the design in the preview to move it");
        }
    }

    fn gallery_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Gallery");
        if self.gallery.is_empty() {
            ui.weak("Saved montages appear here");
            return;
        }

        let entries: Vec<(String, String)> = self
            .gallery
            .list()
            .iter()
            .map(|s| (s.id.clone(), s.label.clone()))
            .collect();

        let mut to_delete: Option<String> = None;
        let mut to_use: Option<String> = None;
        let mut to_copy: Option<String> = None;

        egui::ScrollArea::vertical().show(ui, |ui| {
            for (id, label) in &entries {
                ui.group(|ui| {
                    let stored = self.gallery.get(id).cloned();
                    if let Some(stored) = stored
                        && let Some(tex) = self.thumbnail_for(ui.ctx(), &stored)
                    {
                        ui.image((tex.id(), tex.size_vec2()));
                    }
                    ui.label(label);
                    ui.horizontal(|ui| {
                        if ui.small_button("Use as base").clicked() {
                            to_use = Some(id.clone());
                        }
                        if ui.small_button("Copy URI").clicked() {
                            to_copy = Some(id.clone());
                        }
                        if ui.small_button("Delete").clicked() {
                            to_delete = Some(id.clone());
                        }
                    });
                });
            }
        });

        if let Some(id) = to_use {
            self.use_stored_as_base(&id);
        }
        if let Some(id) = to_copy
            && let Some(stored) = self.gallery.get(&id)
        {
            let uri = io::to_png_data_uri(&stored.png);
            ui.output_mut(|o| o.copied_text = uri);
            self.status = Some("Data URI copied to clipboard".to_string());
            self.error = None;
        }
        if let Some(id) = to_delete {
            let result = self.gallery.delete(&id);
            self.thumbnails.remove(&id);
            self.report(result, "Deleted from gallery");
        }
    }
}

impl eframe::App for MontageApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::left("controls")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| {
                self.controls_panel(ui);
            });

        egui::SidePanel::right("gallery")
            .resizable(true)
            .default_width(150.0)
            .show(ctx, |ui| {
                self.gallery_panel(ui);
            });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(err) = &self.error {
                    ui.colored_label(Color32::LIGHT_RED, err);
                } else if let Some(status) = &self.status {
                    ui.label(status.as_str());
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let response = self.preview.show(
                ui,
                self.base.as_ref().map(|l| &l.rgba),
                self.base.as_ref().map(|l| l.generation).unwrap_or(0),
                self.design.as_ref().map(|l| &l.rgba),
                self.design.as_ref().map(|l| l.generation).unwrap_or(0),
                &self.params,
            );
            // The preview only ever feeds position back; every other
            // parameter arrives exclusively from the control sliders.
            if let Some((x, y)) = response.new_position {
                self.params.position_x = x;
                self.params.position_y = y;
            }
        });
    }
}
