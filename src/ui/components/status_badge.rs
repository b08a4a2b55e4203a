//! Status badge component

use egui::{Color32, Response, Rounding, Ui, Vec2};

use crate::core::GuardState;
use crate::ui::theme::Theme;

pub struct StatusBadge;

impl StatusBadge {
    /// Pill badge for the guard state
    pub fn show(ui: &mut Ui, state: GuardState) -> Response {
        let label = match state {
            GuardState::Free => "FREE",
            GuardState::Busy => "BUSY",
        };
        Self::pill(ui, label, Theme::state_color(state), state.is_paused())
    }

    /// Pill badge for the daemon's reported state
    pub fn daemon(ui: &mut Ui, daemon_state: &str) -> Response {
        let color = Theme::daemon_state_color(daemon_state);
        Self::pill(ui, daemon_state, color, false)
    }

    fn pill(ui: &mut Ui, label: &str, color: Color32, glow: bool) -> Response {
        let (rect, response) = ui.allocate_exact_size(Vec2::new(96.0, 26.0), egui::Sense::hover());

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();

            painter.rect_filled(rect, Rounding::same(13.0), color.linear_multiply(0.15));
            painter.rect_stroke(
                rect,
                Rounding::same(13.0),
                egui::Stroke::new(1.0, color.linear_multiply(0.3)),
            );

            let dot_center = rect.left_center() + Vec2::new(14.0, 0.0);
            if glow {
                painter.circle_filled(dot_center, 6.0, color.linear_multiply(0.3));
            }
            painter.circle_filled(dot_center, 4.0, color);

            painter.text(
                rect.center() + Vec2::new(8.0, 0.0),
                egui::Align2::CENTER_CENTER,
                label,
                egui::FontId::proportional(12.0),
                color,
            );
        }

        response
    }
}
