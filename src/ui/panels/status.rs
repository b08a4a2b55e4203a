//! Status panel - Guard state, daemon status, recent activity

use egui::Ui;

use super::{card, section_header};
use crate::core::guard::PauseReason;
use crate::core::{GuardSnapshot, StatusReport};
use crate::ui::components::StatusBadge;
use crate::ui::theme::{Icons, Theme};

/// `patterns` are the ones the running detector matches against
pub fn render(ui: &mut Ui, snapshot: &GuardSnapshot, report: &StatusReport, patterns: &[String]) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.add_space(8.0);
            render_guard(ui, snapshot, patterns);
            ui.add_space(20.0);
            render_daemon(ui, report);
            ui.add_space(20.0);
        });
}

fn render_guard(ui: &mut Ui, snapshot: &GuardSnapshot, patterns: &[String]) {
    section_header(ui, Icons::SUCCESS, "Guard");

    card().show(ui, |ui| {
        ui.set_width(ui.available_width());

        ui.horizontal(|ui| {
            StatusBadge::show(ui, snapshot.state);
            ui.add_space(12.0);
            let detail = match (&snapshot.last_match, snapshot.last_verdict) {
                (Some(name), _) => format!("Heavy workload running: {}", name),
                (None, Some(false)) => "No heavy workload detected".to_string(),
                (None, _) => "Waiting for the first sample...".to_string(),
            };
            ui.label(egui::RichText::new(detail).color(Theme::TEXT_SECONDARY));
        });

        ui.add_space(10.0);
        ui.label(
            egui::RichText::new(format!("Samples taken: {}", snapshot.ticks))
                .small()
                .color(Theme::TEXT_MUTED),
        );

        if let Some(transition) = &snapshot.last_transition {
            let mut line = format!(
                "{} Last transition {} → {} at {}",
                Icons::HISTORY,
                transition.from,
                transition.to,
                transition.at.format("%H:%M:%S")
            );
            if let Some(trigger) = &transition.trigger {
                line.push_str(&format!(" ({})", trigger));
            }
            ui.label(egui::RichText::new(line).small().color(Theme::TEXT_MUTED));
        }

        if let Some((at, action)) = &snapshot.last_manual {
            ui.label(
                egui::RichText::new(format!(
                    "Manual {} sent at {}",
                    action.label().to_lowercase(),
                    at.format("%H:%M:%S")
                ))
                .small()
                .color(Theme::TEXT_MUTED),
            );
        }

        ui.add_space(8.0);
        ui.label(
            egui::RichText::new(format!("Watching: {}", patterns.join(", ")))
                .small()
                .color(Theme::TEXT_SECONDARY),
        );
    });
}

fn render_daemon(ui: &mut Ui, report: &StatusReport) {
    section_header(ui, Icons::GLOBE, "Daemon");

    card().show(ui, |ui| {
        ui.set_width(ui.available_width());

        match &report.status {
            Some(status) if report.is_reachable() => {
                ui.horizontal(|ui| {
                    StatusBadge::daemon(ui, &status.daemon_state);
                    if let Some(reason) = status.pause_reason.as_deref() {
                        let reason = PauseReason::from(reason);
                        ui.add_space(12.0);
                        ui.label(
                            egui::RichText::new(reason.describe()).color(Theme::TEXT_SECONDARY),
                        );
                    }
                });

                if let Some(desired) = &status.desired_state {
                    ui.label(
                        egui::RichText::new(format!("Requested state: {}", desired))
                            .small()
                            .color(Theme::TEXT_MUTED),
                    );
                }

                if let Some(metrics) = &status.metrics {
                    ui.add_space(6.0);
                    ui.horizontal(|ui| {
                        if let Some(cpu) = metrics.cpu {
                            ui.label(format!("{} CPU {:.0}%", Icons::CPU, cpu));
                            ui.add_space(16.0);
                        }
                        if let Some(ram) = metrics.ram {
                            ui.label(format!("{} RAM {:.0}%", Icons::MEMORY, ram));
                        }
                    });
                }

                if let Some(stall) = status.stall_seconds {
                    ui.label(
                        egui::RichText::new(format!("Last progress {:.0}s ago", stall))
                            .small()
                            .color(Theme::TEXT_MUTED),
                    );
                }
            }
            _ if report.checked_at.is_some() => {
                let error = report.error.as_deref().unwrap_or("No status received");
                ui.horizontal(|ui| {
                    StatusBadge::daemon(ui, "OFFLINE");
                    ui.add_space(12.0);
                    ui.label(
                        egui::RichText::new(format!("{} {}", Icons::WARNING, error))
                            .small()
                            .color(Theme::ERROR),
                    );
                });
            }
            _ => {
                ui.label(egui::RichText::new("Checking daemon...").color(Theme::TEXT_MUTED));
            }
        }

        if let Some(at) = report.checked_at {
            ui.add_space(6.0);
            ui.label(
                egui::RichText::new(format!("Checked at {}", at.format("%H:%M:%S")))
                    .small()
                    .color(Theme::TEXT_MUTED),
            );
        }
    });
}
