//! User interface module - status window and tray icon

mod app;
mod components;
pub mod icon;
mod panels;
mod theme;
mod tray;

pub use app::GuardApp;

use crate::core::settings::Theme as SettingsTheme;
use theme::Theme;

/// Apply the configured theme. `System` falls back to dark.
pub fn apply_theme(ctx: &egui::Context, theme: SettingsTheme) {
    match theme {
        SettingsTheme::Light => Theme::apply_light(ctx),
        SettingsTheme::Dark | SettingsTheme::System => Theme::apply_dark(ctx),
    }
}
