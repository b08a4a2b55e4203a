//! Theme and styling for the status window

use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};

use crate::core::GuardState;

/// Application color palette
pub struct Theme;

impl Theme {
    // Accent - sky blue
    pub const PRIMARY: Color32 = Color32::from_rgb(14, 165, 233); // Sky-500
    pub const PRIMARY_DARK: Color32 = Color32::from_rgb(3, 105, 161); // Sky-700
    pub const PRIMARY_LIGHT: Color32 = Color32::from_rgb(125, 211, 252); // Sky-300

    // Status colors
    pub const SUCCESS: Color32 = Color32::from_rgb(16, 185, 129); // Emerald-500
    pub const WARNING: Color32 = Color32::from_rgb(245, 158, 11); // Amber-500
    pub const ERROR: Color32 = Color32::from_rgb(244, 63, 94); // Rose-500
    pub const INFO: Color32 = Color32::from_rgb(6, 182, 212); // Cyan-500

    // Neutral colors (dark theme)
    pub const BG_PRIMARY: Color32 = Color32::from_rgb(15, 18, 28);
    pub const BG_SECONDARY: Color32 = Color32::from_rgb(22, 27, 40);
    pub const BG_TERTIARY: Color32 = Color32::from_rgb(33, 40, 58);
    pub const BG_HOVER: Color32 = Color32::from_rgb(44, 52, 74);
    pub const BG_ELEVATED: Color32 = Color32::from_rgb(28, 34, 50);

    pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(248, 250, 252);
    pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(160, 168, 186);
    pub const TEXT_MUTED: Color32 = Color32::from_rgb(110, 118, 138);

    pub const BORDER: Color32 = Color32::from_rgb(48, 56, 78);
    pub const BORDER_LIGHT: Color32 = Color32::from_rgb(36, 43, 62);

    /// Apply dark theme to egui
    pub fn apply_dark(ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();
        let mut visuals = Visuals::dark();

        visuals.panel_fill = Self::BG_PRIMARY;
        visuals.window_fill = Self::BG_ELEVATED;
        visuals.extreme_bg_color = Self::BG_PRIMARY;
        visuals.faint_bg_color = Self::BG_TERTIARY;

        visuals.widgets.noninteractive.bg_fill = Self::BG_SECONDARY;
        visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, Self::TEXT_PRIMARY);
        visuals.widgets.noninteractive.bg_stroke = Stroke::new(0.5, Self::BORDER_LIGHT);

        visuals.widgets.inactive.bg_fill = Self::BG_TERTIARY;
        visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, Self::TEXT_SECONDARY);
        visuals.widgets.inactive.bg_stroke = Stroke::new(0.5, Self::BORDER);

        visuals.widgets.hovered.bg_fill = Self::BG_HOVER;
        visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, Self::TEXT_PRIMARY);
        visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, Self::PRIMARY.linear_multiply(0.6));
        visuals.widgets.hovered.expansion = 1.0;

        visuals.widgets.active.bg_fill = Self::PRIMARY;
        visuals.widgets.active.fg_stroke = Stroke::new(1.0, Color32::WHITE);
        visuals.widgets.active.bg_stroke = Stroke::new(1.0, Self::PRIMARY_DARK);

        visuals.selection.bg_fill = Self::PRIMARY.linear_multiply(0.25);
        visuals.selection.stroke = Stroke::new(1.0, Self::PRIMARY);
        visuals.window_stroke = Stroke::new(0.5, Self::BORDER);

        style.visuals = visuals;
        Self::apply_common(&mut style);
        ctx.set_style(style);
    }

    /// Apply light theme to egui
    pub fn apply_light(ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();
        let mut visuals = Visuals::light();

        let bg_primary = Color32::from_rgb(248, 250, 252); // Slate-50
        let bg_secondary = Color32::from_rgb(241, 245, 249); // Slate-100
        let bg_tertiary = Color32::from_rgb(226, 232, 240); // Slate-200
        let text_primary = Color32::from_rgb(15, 23, 42); // Slate-900
        let text_secondary = Color32::from_rgb(71, 85, 105); // Slate-600
        let border = Color32::from_rgb(203, 213, 225); // Slate-300

        visuals.panel_fill = bg_primary;
        visuals.window_fill = Color32::WHITE;
        visuals.extreme_bg_color = Color32::WHITE;
        visuals.faint_bg_color = bg_secondary;

        visuals.widgets.noninteractive.bg_fill = bg_secondary;
        visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, text_primary);
        visuals.widgets.noninteractive.bg_stroke = Stroke::new(0.5, border);

        visuals.widgets.inactive.bg_fill = bg_tertiary;
        visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, text_secondary);
        visuals.widgets.inactive.bg_stroke = Stroke::new(0.5, border);

        visuals.widgets.hovered.bg_fill = border;
        visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, text_primary);
        visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, Self::PRIMARY.linear_multiply(0.7));
        visuals.widgets.hovered.expansion = 1.0;

        visuals.widgets.active.bg_fill = Self::PRIMARY;
        visuals.widgets.active.fg_stroke = Stroke::new(1.0, Color32::WHITE);
        visuals.widgets.active.bg_stroke = Stroke::new(1.0, Self::PRIMARY_DARK);

        visuals.selection.bg_fill = Self::PRIMARY.linear_multiply(0.15);
        visuals.selection.stroke = Stroke::new(1.0, Self::PRIMARY);
        visuals.window_stroke = Stroke::new(0.5, border);

        style.visuals = visuals;
        Self::apply_common(&mut style);
        ctx.set_style(style);
    }

    /// Text sizes, spacing and rounding shared by both themes
    fn apply_common(style: &mut Style) {
        let widgets = &mut style.visuals.widgets;
        for visuals in [
            &mut widgets.noninteractive,
            &mut widgets.inactive,
            &mut widgets.hovered,
            &mut widgets.active,
            &mut widgets.open,
        ] {
            visuals.rounding = Rounding::same(6.0);
        }
        style.visuals.window_rounding = Rounding::same(10.0);
        style.visuals.menu_rounding = Rounding::same(8.0);

        style.text_styles = [
            (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
            (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
            (TextStyle::Button, FontId::new(14.0, FontFamily::Proportional)),
            (TextStyle::Heading, FontId::new(20.0, FontFamily::Proportional)),
            (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
        ]
        .into();

        style.spacing.item_spacing = egui::vec2(8.0, 8.0);
        style.spacing.window_margin = egui::Margin::same(16.0);
        style.spacing.button_padding = egui::vec2(14.0, 8.0);
        style.interaction.tooltip_delay = 0.3;
    }

    /// Color for a guard state
    pub fn state_color(state: GuardState) -> Color32 {
        match state {
            GuardState::Free => Self::SUCCESS,
            GuardState::Busy => Self::WARNING,
        }
    }

    /// Color for the daemon's self-reported state string
    pub fn daemon_state_color(state: &str) -> Color32 {
        match state.to_ascii_uppercase().as_str() {
            "RUNNING" => Self::SUCCESS,
            "IDLE" => Self::INFO,
            "PAUSED" => Self::WARNING,
            "ERROR" | "STALLED" => Self::ERROR,
            _ => Self::TEXT_MUTED,
        }
    }
}

/// Icon characters (using Unicode symbols)
pub struct Icons;

impl Icons {
    pub const PLAY: &'static str = "▶";
    pub const PAUSE: &'static str = "⏸";
    pub const GLOBE: &'static str = "🌐";
    pub const SETTINGS: &'static str = "⚙";
    pub const CPU: &'static str = "⚡";
    pub const MEMORY: &'static str = "💾";
    pub const HISTORY: &'static str = "◷";
    pub const INFO: &'static str = "ℹ";
    pub const SUCCESS: &'static str = "✓";
    pub const WARNING: &'static str = "⚠";
}
