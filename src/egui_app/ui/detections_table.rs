use super::EguiApp;
use eframe::egui::{self, Color32, RichText, Ui};

const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(255, 140, 120);

impl EguiApp {
    /// Render the detection results table. Rows arrive pre-formatted from
    /// the view model; child rows get the highlight color.
    pub(super) fn render_detections_table(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Detections").color(Color32::WHITE).strong());
        ui.add_space(4.0);

        if self.controller.ui.detections.rows.is_empty() {
            ui.weak("No detections yet.");
            return;
        }

        egui::ScrollArea::vertical()
            .id_source("detections_scroll")
            .max_height(240.0)
            .show(ui, |ui| {
                egui::Grid::new("detections_grid")
                    .striped(true)
                    .num_columns(3)
                    .min_col_width(120.0)
                    .show(ui, |ui| {
                        ui.label(RichText::new("Label").strong());
                        ui.label(RichText::new("Confidence").strong());
                        ui.label(RichText::new("Time").strong());
                        ui.end_row();

                        for row in &self.controller.ui.detections.rows {
                            let color = if row.highlighted {
                                HIGHLIGHT_COLOR
                            } else {
                                Color32::WHITE
                            };
                            let label = RichText::new(&row.label).color(color);
                            ui.label(if row.highlighted { label.strong() } else { label });
                            ui.label(RichText::new(&row.confidence_text).color(color));
                            ui.label(RichText::new(&row.timestamp_text).color(color));
                            ui.end_row();
                        }
                    });
            });
    }
}
