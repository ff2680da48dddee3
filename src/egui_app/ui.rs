//! egui renderer for the operator console.
//!
//! The renderer owns no session state; it draws from
//! [`crate::egui_app::state::UiState`] and forwards every interaction to the
//! controller.

mod detections_table;
mod notice;

use std::time::Duration;

use eframe::egui::{self, Color32, Frame, RichText, TextureHandle, TextureOptions, Ui};

use crate::egui_app::controller::PreviewController;
use crate::egui_app::state::{PreviewContent, Route};

/// Smallest window the layout stays usable at.
pub const MIN_VIEWPORT_SIZE: egui::Vec2 = egui::Vec2::new(760.0, 560.0);

/// Renders the egui UI using the shared controller state.
pub struct EguiApp {
    controller: PreviewController,
    visuals_set: bool,
    preview_tex: Option<TextureHandle>,
    preview_serial: u64,
}

impl EguiApp {
    /// Create a new egui app, loading persisted configuration.
    pub fn new() -> Result<Self, String> {
        let mut controller = PreviewController::new();
        controller
            .load_configuration()
            .map_err(|err| format!("Failed to load config: {err}"))?;
        Ok(Self {
            controller,
            visuals_set: false,
            preview_tex: None,
            preview_serial: 0,
        })
    }

    fn apply_visuals(&mut self, ctx: &egui::Context) {
        if self.visuals_set {
            return;
        }
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = Color32::from_rgb(12, 12, 12);
        visuals.panel_fill = Color32::from_rgb(16, 16, 16);
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(16, 16, 16);
        ctx.set_visuals(visuals);
        self.visuals_set = true;
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar")
            .frame(Frame::none().fill(Color32::from_rgb(24, 24, 24)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if self.controller.ui.route == Route::Module
                        && ui.button(RichText::new("< Back").color(Color32::WHITE)).clicked()
                    {
                        self.controller.go_back();
                    }
                    ui.add_space(8.0);
                    ui.label(RichText::new("Drone Tech AI Portal").color(Color32::WHITE).strong());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.add_space(8.0);
                        self.render_initials_badge(ui);
                    });
                });
            });
    }

    fn render_initials_badge(&self, ui: &mut Ui) {
        let initials = &self.controller.ui.header_initials;
        if initials.is_empty() {
            return;
        }
        let (rect, _response) =
            ui.allocate_exact_size(egui::vec2(26.0, 26.0), egui::Sense::hover());
        ui.painter()
            .circle_filled(rect.center(), 13.0, Color32::from_rgb(70, 110, 170));
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            initials,
            egui::FontId::proportional(12.0),
            Color32::WHITE,
        );
    }

    fn render_status(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .frame(Frame::none().fill(Color32::from_rgb(0, 0, 0)))
            .show(ctx, |ui| {
                let status = &self.controller.ui.status;
                ui.horizontal(|ui| {
                    ui.add_space(8.0);
                    ui.painter().circle_filled(
                        ui.cursor().min + egui::vec2(7.0, 10.0),
                        6.0,
                        status.tone.color(),
                    );
                    ui.add_space(14.0);
                    ui.label(RichText::new(&status.text).color(Color32::WHITE));
                });
            });
    }

    fn render_dashboard(&mut self, ui: &mut Ui) {
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.heading("Drone Tech AI Portal");
            ui.add_space(16.0);
            Frame::group(ui.style())
                .fill(Color32::from_rgb(22, 22, 22))
                .show(ui, |ui| {
                    ui.set_min_width(360.0);
                    ui.label(
                        RichText::new(crate::egui_app::view_model::MODULE_HEADING)
                            .color(Color32::WHITE)
                            .strong(),
                    );
                    ui.add_space(4.0);
                    ui.label("Monitor live or uploaded footage for child detections.");
                    ui.add_space(10.0);
                    if ui.button("Open module").clicked() {
                        self.controller.open_module();
                    }
                });
        });
    }

    fn render_module(&mut self, ui: &mut Ui) {
        ui.add_space(8.0);
        ui.label(
            RichText::new(self.controller.ui.greeting.clone())
                .color(Color32::WHITE)
                .strong(),
        );
        ui.add_space(10.0);

        ui.horizontal(|ui| {
            if ui.button("Real-time Detection").clicked() {
                self.controller.start_live_preview();
            }
            if ui.button("Upload Local File").clicked() {
                self.controller.pick_local_file();
            }
            if ui.button("Run Detection").clicked() {
                self.controller.run_detection();
            }
            if ui.button("Clear Preview").clicked() {
                self.controller.clear_preview();
            }
        });
        ui.add_space(10.0);

        self.render_preview(ui);
        ui.add_space(12.0);
        ui.separator();
        ui.add_space(4.0);
        self.render_detections_table(ui);
    }

    fn render_preview(&mut self, ui: &mut Ui) {
        // Pull what we need out of the state first so the texture cache can
        // be updated without holding a borrow of the controller.
        let serial = self.controller.ui.preview.frame_serial;
        let (image, caption) = match &self.controller.ui.preview.content {
            PreviewContent::Empty => {
                ui.weak("No preview selected.");
                return;
            }
            PreviewContent::Stream { label, latest } => (latest.clone(), label.clone()),
            PreviewContent::LocalImage { name, image } => (Some(image.clone()), name.clone()),
            PreviewContent::FileCard { name, size_bytes } => {
                Frame::group(ui.style())
                    .fill(Color32::from_rgb(22, 22, 22))
                    .show(ui, |ui| {
                        ui.label(RichText::new(name).color(Color32::WHITE).strong());
                        ui.label(format!("Ready for detection ({})", format_size(*size_bytes)));
                    });
                return;
            }
        };

        match image {
            Some(image) => {
                let texture_id = self.sync_preview_texture(ui, image, serial);
                let available = ui.available_width().min(720.0);
                if let Some(tex) = self.preview_tex.as_ref() {
                    let size = tex.size_vec2();
                    let scale = (available / size.x).min(1.0);
                    ui.image((texture_id, size * scale));
                }
                ui.weak(caption);
            }
            None => {
                ui.weak(format!("{caption}: waiting for frames"));
            }
        }
    }

    fn sync_preview_texture(
        &mut self,
        ui: &mut Ui,
        image: egui::ColorImage,
        serial: u64,
    ) -> egui::TextureId {
        if let Some(tex) = self.preview_tex.as_mut() {
            if self.preview_serial != serial {
                tex.set(image, TextureOptions::LINEAR);
                self.preview_serial = serial;
            }
            tex.id()
        } else {
            let tex = ui
                .ctx()
                .load_texture("preview_texture", image, TextureOptions::LINEAR);
            let id = tex.id();
            self.preview_tex = Some(tex);
            self.preview_serial = serial;
            id
        }
    }
}

fn format_size(size_bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;
    if size_bytes >= MB {
        format!("{:.1} MB", size_bytes as f64 / MB as f64)
    } else if size_bytes >= KB {
        format!("{:.1} KB", size_bytes as f64 / KB as f64)
    } else {
        format!("{size_bytes} B")
    }
}

impl eframe::App for EguiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_visuals(ctx);
        self.controller.process_background_messages();
        if self.controller.background_work_active() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        self.render_top_bar(ctx);
        self.render_status(ctx);
        egui::CentralPanel::default().show(ctx, |ui| match self.controller.ui.route {
            Route::Dashboard => self.render_dashboard(ui),
            Route::Module => self.render_module(ui),
        });
        self.render_notice(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_sizes_by_magnitude() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024 + 512 * 1024), "3.5 MB");
    }
}
