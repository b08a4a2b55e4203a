//! Main content panels

pub mod settings;
pub mod status;

use egui::{Color32, Ui};

use crate::ui::theme::Theme;

/// Section header helper
fn section_header(ui: &mut Ui, icon: &str, title: &str) {
    ui.horizontal(|ui| {
        ui.label(
            egui::RichText::new(icon)
                .size(18.0)
                .color(Theme::PRIMARY_LIGHT),
        );
        ui.add_space(10.0);
        ui.label(
            egui::RichText::new(title)
                .size(18.0)
                .strong()
                .color(Color32::WHITE),
        );
    });
    ui.add_space(12.0);
}

/// Card frame used by both panels
fn card() -> egui::Frame {
    egui::Frame::none()
        .fill(Theme::BG_SECONDARY)
        .rounding(egui::Rounding::same(12.0))
        .stroke(egui::Stroke::new(1.0, Theme::BORDER_LIGHT))
        .inner_margin(egui::Margin::same(18.0))
}
