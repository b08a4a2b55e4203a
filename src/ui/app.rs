//! Status window

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::time::{Duration, Instant};

use egui::{CentralPanel, Context, TopBottomPanel, ViewportCommand};
use tokio::sync::watch;
use tracing::{info, warn};

use super::components::StatusBadge;
use super::panels::{self, settings::SaveOutcome};
use super::theme::{Icons, Theme};
use super::tray::{self, ShellAction, TrayManager};
use crate::core::{AppState, GuardState, Notification, StatusReport};

/// Active view in the main panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Status,
    Settings,
}

impl ActiveView {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Settings => "Settings",
        }
    }
}

/// In-window toast
#[derive(Debug, Clone)]
struct Toast {
    message: String,
    level: ToastLevel,
    created_at: Instant,
}

#[derive(Debug, Clone, Copy)]
enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl From<&Notification> for ToastLevel {
    fn from(notification: &Notification) -> Self {
        match notification {
            Notification::Paused { .. } => Self::Warning,
            Notification::Resumed => Self::Success,
            Notification::ManualPause | Notification::ManualResume => Self::Info,
        }
    }
}

/// Presentation shell: status window plus tray icon
pub struct GuardApp {
    state: AppState,
    status: watch::Receiver<StatusReport>,
    notifications: mpsc::Receiver<Notification>,
    toasts: Vec<Toast>,
    tray: Option<TrayManager>,
    /// Set by "Exit" so closing the window is not turned into hiding it
    quitting: Arc<AtomicBool>,
    active_view: ActiveView,
    /// Heavy process list as edited in the settings panel
    patterns_text: String,
    /// Window title, mirrors the tray tooltip
    shown_title: String,
    first_frame: bool,
}

impl GuardApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        state: AppState,
        status: watch::Receiver<StatusReport>,
        notifications: mpsc::Receiver<Notification>,
        repaint: Arc<OnceLock<Context>>,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        // Wakes the UI when the controller emits a notification
        let _ = repaint.set(ctx.clone());

        let (theme, start_minimized) = state
            .settings
            .read()
            .map(|s| (s.theme, s.start_minimized))
            .unwrap_or_default();
        super::apply_theme(&ctx, theme);

        let quitting = Arc::new(AtomicBool::new(false));
        let tray = {
            let ctx = ctx.clone();
            let quitting = Arc::clone(&quitting);
            match TrayManager::new(state.guard.clone(), state.dashboard_url(), move |action| {
                handle_window_action(&ctx, &quitting, action)
            }) {
                Ok(tray) => Some(tray),
                Err(e) => {
                    warn!("Running without a tray icon: {}", e);
                    None
                }
            }
        };

        // Without a tray there would be no way to bring the window back
        if start_minimized && tray.is_some() {
            ctx.send_viewport_cmd(ViewportCommand::Visible(false));
        }

        let patterns_text = panels::settings::format_patterns(&state.heavy_processes());

        Self {
            state,
            status,
            notifications,
            toasts: Vec::new(),
            tray,
            quitting,
            active_view: ActiveView::Status,
            patterns_text,
            shown_title: String::new(),
            first_frame: true,
        }
    }

    fn toast(&mut self, message: impl Into<String>, level: ToastLevel) {
        self.toasts.push(Toast {
            message: message.into(),
            level,
            created_at: Instant::now(),
        });
    }

    /// Turn controller notifications into toasts
    fn drain_notifications(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            let level = ToastLevel::from(&notification);
            self.toast(notification.body(), level);
        }
    }

    fn cleanup_toasts(&mut self) {
        let timeout = Duration::from_secs(5);
        self.toasts.retain(|t| t.created_at.elapsed() < timeout);
    }

    /// Hide instead of exit while a tray icon can bring the window back
    fn handle_close_request(&mut self, ctx: &Context) {
        if !ctx.input(|i| i.viewport().close_requested()) {
            return;
        }
        if self.tray.is_some() && !self.quitting.load(Ordering::SeqCst) {
            ctx.send_viewport_cmd(ViewportCommand::CancelClose);
            ctx.send_viewport_cmd(ViewportCommand::Visible(false));
            info!("Status window hidden to tray");
        }
    }

    fn shell_action(&self, ctx: &Context, action: ShellAction) {
        let dashboard = self.state.dashboard_url();
        if let Some(action) = tray::perform(action, &self.state.guard, &dashboard) {
            handle_window_action(ctx, &self.quitting, action);
        }
    }

    fn render_top_bar(&mut self, ctx: &Context, state: GuardState) {
        TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::none()
                    .fill(Theme::BG_PRIMARY)
                    .stroke(egui::Stroke::new(1.0, Theme::BORDER_LIGHT))
                    .inner_margin(egui::Margin::symmetric(20.0, 12.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("◈").size(22.0).color(Theme::PRIMARY));
                    ui.label(
                        egui::RichText::new(crate::APP_NAME)
                            .size(20.0)
                            .strong()
                            .color(Theme::TEXT_PRIMARY),
                    );
                    ui.add_space(8.0);
                    StatusBadge::show(ui, state);
                    ui.add_space(16.0);

                    for view in [ActiveView::Status, ActiveView::Settings] {
                        let selected = self.active_view == view;
                        let text = egui::RichText::new(view.label()).color(if selected {
                            Theme::PRIMARY_LIGHT
                        } else {
                            Theme::TEXT_SECONDARY
                        });
                        if ui.selectable_label(selected, text).clicked() {
                            self.active_view = view;
                        }
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let dashboard = egui::Button::new(
                            egui::RichText::new(format!("{} Dashboard", Icons::GLOBE))
                                .color(Theme::TEXT_PRIMARY),
                        )
                        .fill(Theme::BG_TERTIARY)
                        .rounding(egui::Rounding::same(8.0))
                        .min_size(egui::vec2(110.0, 34.0));
                        if ui.add(dashboard).clicked() {
                            self.shell_action(ctx, ShellAction::OpenDashboard);
                        }

                        ui.add_space(8.0);

                        let pause = egui::Button::new(
                            egui::RichText::new(format!("{} Pause", Icons::PAUSE))
                                .color(Theme::TEXT_PRIMARY),
                        )
                        .fill(Theme::BG_TERTIARY)
                        .rounding(egui::Rounding::same(8.0))
                        .min_size(egui::vec2(90.0, 34.0));
                        if ui.add(pause).clicked() {
                            self.shell_action(ctx, ShellAction::Pause);
                        }

                        let resume = egui::Button::new(
                            egui::RichText::new(format!("{} Resume", Icons::PLAY))
                                .color(egui::Color32::WHITE),
                        )
                        .fill(Theme::PRIMARY)
                        .rounding(egui::Rounding::same(8.0))
                        .min_size(egui::vec2(90.0, 34.0));
                        if ui.add(resume).clicked() {
                            self.shell_action(ctx, ShellAction::Resume);
                        }
                    });
                });
            });
    }

    fn render_main_content(&mut self, ctx: &Context) {
        let mut outcome = None;
        CentralPanel::default().show(ctx, |ui| match self.active_view {
            ActiveView::Status => {
                let snapshot = self.state.guard.snapshot();
                let report = self.status.borrow().clone();
                let patterns = self.state.watched_patterns();
                panels::status::render(ui, &snapshot, &report, patterns);
            }
            ActiveView::Settings => {
                outcome = panels::settings::render(ui, &self.state, &mut self.patterns_text, ctx);
            }
        });

        match outcome {
            Some(SaveOutcome::Saved) => self.toast("Settings saved", ToastLevel::Success),
            Some(SaveOutcome::Failed(e)) => {
                self.toast(format!("Failed to save settings: {}", e), ToastLevel::Error)
            }
            None => {}
        }
    }

    fn render_toasts(&self, ctx: &Context) {
        if self.toasts.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("toasts"))
            .fixed_pos(egui::pos2(ctx.screen_rect().width() - 340.0, 72.0))
            .show(ctx, |ui| {
                for toast in &self.toasts {
                    let (icon, accent) = match toast.level {
                        ToastLevel::Info => (Icons::INFO, Theme::INFO),
                        ToastLevel::Success => (Icons::SUCCESS, Theme::SUCCESS),
                        ToastLevel::Warning => (Icons::WARNING, Theme::WARNING),
                        ToastLevel::Error => ("✕", Theme::ERROR),
                    };

                    egui::Frame::none()
                        .fill(Theme::BG_ELEVATED)
                        .rounding(egui::Rounding::same(10.0))
                        .stroke(egui::Stroke::new(1.0, accent.linear_multiply(0.5)))
                        .shadow(egui::Shadow {
                            offset: egui::vec2(0.0, 4.0),
                            blur: 12.0,
                            spread: 2.0,
                            color: egui::Color32::from_black_alpha(60),
                        })
                        .inner_margin(egui::Margin::same(14.0))
                        .show(ui, |ui| {
                            ui.set_width(300.0);
                            ui.horizontal(|ui| {
                                ui.label(egui::RichText::new(icon).size(14.0).color(accent));
                                ui.add_space(8.0);
                                ui.label(
                                    egui::RichText::new(&toast.message)
                                        .size(13.0)
                                        .color(Theme::TEXT_PRIMARY),
                                );
                            });
                        });

                    ui.add_space(8.0);
                }
            });
    }
}

/// Window-level actions, callable from the tray thread
fn handle_window_action(ctx: &Context, quitting: &AtomicBool, action: ShellAction) {
    match action {
        ShellAction::ShowWindow => {
            ctx.send_viewport_cmd(ViewportCommand::Visible(true));
            ctx.send_viewport_cmd(ViewportCommand::Focus);
        }
        ShellAction::Quit => {
            quitting.store(true, Ordering::SeqCst);
            ctx.send_viewport_cmd(ViewportCommand::Close);
        }
        _ => {}
    }
    ctx.request_repaint();
}

impl eframe::App for GuardApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            self.first_frame = false;
            info!("First frame rendered");
        }

        self.handle_close_request(ctx);
        self.drain_notifications();
        self.cleanup_toasts();

        let snapshot = self.state.guard.snapshot();
        if let Some(tray) = self.tray.as_mut() {
            tray.update(&snapshot);
        }

        let title = tray::tooltip(&snapshot);
        if title != self.shown_title {
            ctx.send_viewport_cmd(ViewportCommand::Title(title.clone()));
            self.shown_title = title;
        }

        // Status polling and toast expiry have no other wake-up
        ctx.request_repaint_after(Duration::from_millis(250));

        self.render_top_bar(ctx, snapshot.state);
        self.render_main_content(ctx);
        self.render_toasts(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Status window closed");
    }
}
