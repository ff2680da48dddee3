use super::EguiApp;
use eframe::egui::{self, Align2, Color32, RichText};

impl EguiApp {
    /// Render the blocking notification, if one is active. The backdrop
    /// swallows clicks so the controls behind it stay inert until the
    /// operator dismisses it.
    pub(super) fn render_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.controller.ui.notice.clone() else {
            return;
        };
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.controller.dismiss_notice();
            return;
        }

        self.render_notice_backdrop(ctx);

        let mut open = true;
        egui::Window::new(RichText::new(&notice.title).strong())
            .anchor(Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .order(egui::Order::Foreground)
            .collapsible(false)
            .resizable(false)
            .default_width(420.0)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.set_min_width(420.0);
                ui.label(RichText::new(&notice.message).color(Color32::WHITE));
                ui.add_space(12.0);
                if ui.button("OK").clicked() {
                    self.controller.dismiss_notice();
                }
            });

        if !open {
            self.controller.dismiss_notice();
        }
    }

    fn render_notice_backdrop(&mut self, ctx: &egui::Context) {
        let rect = ctx.viewport_rect();
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Background,
            egui::Id::new("notice_backdrop_paint"),
        ));
        painter.rect_filled(
            rect,
            0.0,
            Color32::from_rgba_premultiplied(0, 0, 0, 160),
        );

        egui::Area::new(egui::Id::new("notice_backdrop_blocker"))
            .order(egui::Order::Middle)
            .fixed_pos(rect.min)
            .show(ctx, |ui| {
                let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
                if response.clicked() {
                    ui.ctx().request_repaint();
                }
            });
    }
}
