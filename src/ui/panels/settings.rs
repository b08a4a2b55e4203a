//! Settings panel

use egui::{Color32, Context, Ui, Vec2};

use super::section_header;
use crate::core::settings::{NotificationLevel, Theme as SettingsTheme};
use crate::core::AppState;
use crate::ui::theme::{Icons, Theme};

/// Outcome of a click on "Save"
pub enum SaveOutcome {
    Saved,
    Failed(String),
}

/// Custom toggle switch widget
fn toggle_switch(ui: &mut Ui, on: &mut bool) -> egui::Response {
    let desired_size = Vec2::new(44.0, 24.0);
    let (rect, mut response) = ui.allocate_exact_size(desired_size, egui::Sense::click());

    if response.clicked() {
        *on = !*on;
        response.mark_changed();
    }

    if ui.is_rect_visible(rect) {
        let how_on = ui.ctx().animate_bool_responsive(response.id, *on);
        let track_color = if *on {
            Theme::PRIMARY.linear_multiply(0.9 + 0.1 * how_on)
        } else {
            Theme::BG_TERTIARY
        };

        ui.painter().rect(
            rect,
            egui::Rounding::same(12.0),
            track_color,
            egui::Stroke::new(1.0, if *on { Theme::PRIMARY } else { Theme::BORDER }),
        );

        let circle_x = egui::lerp((rect.left() + 12.0)..=(rect.right() - 12.0), how_on);
        let circle_center = egui::pos2(circle_x, rect.center().y);
        ui.painter().circle(
            circle_center + Vec2::new(0.0, 1.0),
            9.0,
            Color32::from_black_alpha(30),
            egui::Stroke::NONE,
        );
        ui.painter()
            .circle(circle_center, 9.0, Color32::WHITE, egui::Stroke::NONE);
    }

    response
}

/// Helper to render a setting row with label, description, and custom widget
fn setting_row(ui: &mut Ui, label: &str, description: &str, add_widget: impl FnOnce(&mut Ui)) {
    ui.horizontal(|ui| {
        ui.with_layout(egui::Layout::left_to_right(egui::Align::Center), |ui| {
            ui.vertical(|ui| {
                ui.add_space(2.0);
                ui.label(egui::RichText::new(label).size(14.0).color(Color32::WHITE));
                ui.label(
                    egui::RichText::new(description)
                        .size(12.0)
                        .color(Theme::TEXT_SECONDARY),
                );
            });
        });
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            add_widget(ui);
        });
    });
    ui.add_space(14.0);
}

fn toggle_setting(ui: &mut Ui, value: &mut bool, label: &str, description: &str) {
    setting_row(ui, label, description, |ui| {
        toggle_switch(ui, value);
    });
}

fn section_frame(ui: &mut Ui, add_contents: impl FnOnce(&mut Ui)) {
    super::card()
        .outer_margin(egui::Margin::symmetric(0.0, 4.0))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            add_contents(ui);
        });
}

fn finish_job_label(value: Option<bool>) -> &'static str {
    match value {
        None => "Daemon default",
        Some(true) => "Finish current job",
        Some(false) => "Stop immediately",
    }
}

/// Render the editor. `patterns` holds the heavy process list as edited
/// text, one pattern per line; it is folded back into the settings on save.
pub fn render(
    ui: &mut Ui,
    state: &AppState,
    patterns: &mut String,
    ctx: &Context,
) -> Option<SaveOutcome> {
    let mut outcome = None;

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.set_max_width(640.0);

                let mut save_clicked = false;
                {
                    let mut settings = match state.settings.write() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };

                    ui.add_space(8.0);
                    section_header(ui, Icons::CPU, "Detection");
                    section_frame(ui, |ui| {
                        ui.label(
                            egui::RichText::new("Heavy applications (one per line)")
                                .size(14.0)
                                .color(Color32::WHITE),
                        );
                        ui.label(
                            egui::RichText::new(
                                "A running process whose name contains any of these, \
                                 ignoring case, pauses the daemon",
                            )
                            .size(12.0)
                            .color(Theme::TEXT_SECONDARY),
                        );
                        ui.add_space(6.0);
                        ui.add(
                            egui::TextEdit::multiline(patterns)
                                .desired_rows(5)
                                .desired_width(f32::INFINITY)
                                .font(egui::TextStyle::Monospace),
                        );
                        ui.add_space(14.0);

                        setting_row(ui, "Check interval", "How often processes are sampled", |ui| {
                            ui.add(
                                egui::DragValue::new(&mut settings.monitor_interval_ms)
                                    .range(250..=60_000)
                                    .speed(50.0)
                                    .suffix(" ms"),
                            );
                        });
                        setting_row(
                            ui,
                            "Confirm samples",
                            "Matching samples in a row before switching state",
                            |ui| {
                                ui.add(
                                    egui::DragValue::new(&mut settings.confirm_samples)
                                        .range(1..=20),
                                );
                            },
                        );
                        setting_row(
                            ui,
                            "Resume cooldown",
                            "Minimum time paused before resuming automatically",
                            |ui| {
                                ui.add(
                                    egui::DragValue::new(&mut settings.resume_cooldown_secs)
                                        .range(0..=3600)
                                        .suffix(" s"),
                                );
                            },
                        );
                    });

                    ui.add_space(16.0);
                    section_header(ui, Icons::GLOBE, "Daemon");
                    section_frame(ui, |ui| {
                        setting_row(ui, "Control API", "Where pause and resume are sent", |ui| {
                            ui.add(
                                egui::TextEdit::singleline(&mut settings.daemon_url)
                                    .desired_width(240.0),
                            );
                        });
                        setting_row(ui, "Dashboard", "Opened from the tray menu", |ui| {
                            ui.add(
                                egui::TextEdit::singleline(&mut settings.dashboard_url)
                                    .desired_width(240.0),
                            );
                        });
                        setting_row(
                            ui,
                            "Request timeout",
                            "Give up on an unresponsive daemon after",
                            |ui| {
                                ui.add(
                                    egui::DragValue::new(&mut settings.request_timeout_ms)
                                        .range(1000..=30_000)
                                        .speed(100.0)
                                        .suffix(" ms"),
                                );
                            },
                        );
                        setting_row(
                            ui,
                            "On pause",
                            "What the daemon does with a running job",
                            |ui| {
                                egui::ComboBox::from_id_salt("finish_current_job")
                                    .selected_text(finish_job_label(settings.finish_current_job))
                                    .show_ui(ui, |ui| {
                                        for value in [None, Some(true), Some(false)] {
                                            ui.selectable_value(
                                                &mut settings.finish_current_job,
                                                value,
                                                finish_job_label(value),
                                            );
                                        }
                                    });
                            },
                        );
                    });

                    ui.add_space(16.0);
                    section_header(ui, Icons::SETTINGS, "Interface");
                    section_frame(ui, |ui| {
                        setting_row(ui, "Notifications", "Which events show a desktop popup", |ui| {
                            egui::ComboBox::from_id_salt("notification_level")
                                .selected_text(settings.notification_level.label())
                                .show_ui(ui, |ui| {
                                    for level in NotificationLevel::all() {
                                        ui.selectable_value(
                                            &mut settings.notification_level,
                                            *level,
                                            level.label(),
                                        );
                                    }
                                });
                        });

                        let previous_theme = settings.theme;
                        setting_row(ui, "Theme", "Window appearance", |ui| {
                            egui::ComboBox::from_id_salt("theme")
                                .selected_text(settings.theme.label())
                                .show_ui(ui, |ui| {
                                    for theme in
                                        [SettingsTheme::Dark, SettingsTheme::Light, SettingsTheme::System]
                                    {
                                        ui.selectable_value(&mut settings.theme, theme, theme.label());
                                    }
                                });
                        });
                        if settings.theme != previous_theme {
                            crate::ui::apply_theme(ctx, settings.theme);
                        }

                        toggle_setting(
                            ui,
                            &mut settings.start_minimized,
                            "Start in tray",
                            "Keep the window hidden at startup",
                        );
                        toggle_setting(
                            ui,
                            &mut settings.debug_logging,
                            "Debug logging",
                            "Verbose log output",
                        );
                    });

                    ui.add_space(16.0);
                    ui.horizontal(|ui| {
                        let save = egui::Button::new(
                            egui::RichText::new(format!("{} Save", Icons::SUCCESS))
                                .color(Color32::WHITE),
                        )
                        .fill(Theme::PRIMARY);
                        if ui.add(save).clicked() {
                            settings.heavy_processes = parse_patterns(patterns);
                            save_clicked = true;
                        }
                        ui.add_space(8.0);
                        ui.label(
                            egui::RichText::new(format!(
                                "{} Detection and daemon changes apply after a restart",
                                Icons::INFO
                            ))
                            .small()
                            .color(Theme::TEXT_MUTED),
                        );
                    });
                    ui.add_space(20.0);
                }

                if save_clicked {
                    outcome = Some(match state.save_settings() {
                        Ok(()) => {
                            *patterns = format_patterns(&state.heavy_processes());
                            SaveOutcome::Saved
                        }
                        Err(e) => SaveOutcome::Failed(format!("{:#}", e)),
                    });
                }
            });
        });

    outcome
}

/// One pattern per line, blank lines dropped
pub fn parse_patterns(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn format_patterns(patterns: &[String]) -> String {
    patterns.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_parse_one_per_line() {
        let parsed = parse_patterns("GTA5\n\n  blender  \r\npremiere\n");
        assert_eq!(parsed, vec!["GTA5", "blender", "premiere"]);
        assert_eq!(format_patterns(&parsed), "GTA5\nblender\npremiere");
    }
}
