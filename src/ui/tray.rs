//! System tray icon and menu
//!
//! The tray must be created on the main thread after the event loop has
//! started. Menu and icon events are handled on dedicated threads so
//! pause/resume keep working while the status window is hidden.

use tracing::warn;

use crate::core::{GuardHandle, GuardSnapshot, GuardState};

/// Actions offered by the tray menu and the status window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "linux", allow(dead_code))]
pub enum ShellAction {
    Resume,
    Pause,
    OpenDashboard,
    ShowWindow,
    Quit,
}

/// Mouse gestures on the tray icon itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "linux", allow(dead_code))]
pub enum IconGesture {
    Click,
    DoubleClick,
}

#[cfg_attr(target_os = "linux", allow(dead_code))]
impl IconGesture {
    /// A single click only opens the menu; a double click opens the dashboard
    pub fn action(self) -> Option<ShellAction> {
        match self {
            Self::Click => None,
            Self::DoubleClick => Some(ShellAction::OpenDashboard),
        }
    }
}

/// Tooltip text for the current snapshot
pub fn tooltip(snapshot: &GuardSnapshot) -> String {
    match (snapshot.state, snapshot.last_match.as_deref()) {
        (GuardState::Busy, Some(name)) => format!("{} - paused for {}", crate::APP_NAME, name),
        (GuardState::Busy, None) => format!("{} - paused", crate::APP_NAME),
        (GuardState::Free, _) => format!("{} - system free", crate::APP_NAME),
    }
}

/// Carry out an action that does not need the UI thread.
///
/// Returns the action back when the window has to handle it.
pub fn perform(
    action: ShellAction,
    guard: &GuardHandle,
    dashboard_url: &str,
) -> Option<ShellAction> {
    match action {
        ShellAction::Pause => {
            guard.pause_now();
            None
        }
        ShellAction::Resume => {
            guard.resume_now();
            None
        }
        ShellAction::OpenDashboard => {
            if let Err(e) = open::that(dashboard_url) {
                warn!("Failed to open dashboard {}: {}", dashboard_url, e);
            }
            None
        }
        ShellAction::ShowWindow | ShellAction::Quit => Some(action),
    }
}

#[cfg(not(target_os = "linux"))]
pub use native::TrayManager;

#[cfg(not(target_os = "linux"))]
mod native {
    use super::*;
    use tracing::{debug, info};
    use tray_icon::menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
    use tray_icon::{Icon, TrayIcon, TrayIconBuilder, TrayIconEvent};

    const ICON_SIZE: usize = 32;

    struct MenuIds {
        resume: MenuId,
        pause: MenuId,
        dashboard: MenuId,
        show: MenuId,
        quit: MenuId,
    }

    impl MenuIds {
        fn event_for(&self, id: &MenuId) -> Option<ShellAction> {
            if *id == self.resume {
                Some(ShellAction::Resume)
            } else if *id == self.pause {
                Some(ShellAction::Pause)
            } else if *id == self.dashboard {
                Some(ShellAction::OpenDashboard)
            } else if *id == self.show {
                Some(ShellAction::ShowWindow)
            } else if *id == self.quit {
                Some(ShellAction::Quit)
            } else {
                None
            }
        }
    }

    /// Owns the tray icon; dropping it removes the icon
    pub struct TrayManager {
        tray: TrayIcon,
        shown_state: GuardState,
        shown_tooltip: String,
    }

    impl TrayManager {
        /// Create the tray icon and start the menu thread.
        ///
        /// `on_window_action` receives the events the window must handle.
        pub fn new(
            guard: GuardHandle,
            dashboard_url: String,
            on_window_action: impl Fn(ShellAction) + Send + 'static,
        ) -> Result<Self, String> {
            let menu = Menu::new();
            let resume = MenuItem::new("▶ Resume", true, None);
            let pause = MenuItem::new("⏸ Pause", true, None);
            let dashboard = MenuItem::new("🌐 Open dashboard", true, None);
            let show = MenuItem::new("Show status window", true, None);
            let quit = MenuItem::new("❌ Exit", true, None);

            menu.append(&resume).map_err(|e| e.to_string())?;
            menu.append(&pause).map_err(|e| e.to_string())?;
            menu.append(&PredefinedMenuItem::separator())
                .map_err(|e| e.to_string())?;
            menu.append(&dashboard).map_err(|e| e.to_string())?;
            menu.append(&show).map_err(|e| e.to_string())?;
            menu.append(&PredefinedMenuItem::separator())
                .map_err(|e| e.to_string())?;
            menu.append(&quit).map_err(|e| e.to_string())?;

            let ids = MenuIds {
                resume: resume.id().clone(),
                pause: pause.id().clone(),
                dashboard: dashboard.id().clone(),
                show: show.id().clone(),
                quit: quit.id().clone(),
            };

            let initial = guard.snapshot();
            let shown_tooltip = tooltip(&initial);
            let tray = TrayIconBuilder::new()
                .with_menu(Box::new(menu))
                .with_tooltip(&shown_tooltip)
                .with_icon(state_icon(initial.state)?)
                .build()
                .map_err(|e| e.to_string())?;
            info!("Tray icon created");

            {
                let guard = guard.clone();
                let dashboard_url = dashboard_url.clone();
                std::thread::Builder::new()
                    .name("tray-icon-events".into())
                    .spawn(move || {
                        let receiver = TrayIconEvent::receiver();
                        while let Ok(event) = receiver.recv() {
                            let gesture = match event {
                                TrayIconEvent::DoubleClick { .. } => IconGesture::DoubleClick,
                                TrayIconEvent::Click { .. } => IconGesture::Click,
                                _ => continue,
                            };
                            if let Some(action) = gesture.action() {
                                debug!("Tray icon {:?}: {:?}", gesture, action);
                                perform(action, &guard, &dashboard_url);
                            }
                        }
                    })
                    .map_err(|e| e.to_string())?;
            }

            std::thread::Builder::new()
                .name("tray-menu".into())
                .spawn(move || {
                    let receiver = MenuEvent::receiver();
                    while let Ok(event) = receiver.recv() {
                        let Some(action) = ids.event_for(&event.id) else {
                            continue;
                        };
                        debug!("Tray event: {:?}", action);
                        if let Some(action) = perform(action, &guard, &dashboard_url) {
                            on_window_action(action);
                        }
                    }
                })
                .map_err(|e| e.to_string())?;

            Ok(Self {
                tray,
                shown_state: initial.state,
                shown_tooltip,
            })
        }

        /// Refresh icon and tooltip when the snapshot changed
        pub fn update(&mut self, snapshot: &GuardSnapshot) {
            if snapshot.state != self.shown_state {
                match state_icon(snapshot.state) {
                    Ok(icon) => {
                        if let Err(e) = self.tray.set_icon(Some(icon)) {
                            warn!("Failed to update tray icon: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to build tray icon: {}", e),
                }
                self.shown_state = snapshot.state;
            }

            let text = tooltip(snapshot);
            if text != self.shown_tooltip {
                if let Err(e) = self.tray.set_tooltip(Some(&text)) {
                    warn!("Failed to update tray tooltip: {}", e);
                }
                self.shown_tooltip = text;
            }
        }
    }

    fn state_icon(state: GuardState) -> Result<Icon, String> {
        let rgba = crate::ui::icon::disc_rgba(ICON_SIZE, state);
        Icon::from_rgba(rgba, ICON_SIZE as u32, ICON_SIZE as u32).map_err(|e| e.to_string())
    }
}

// ── Linux: no tray (needs a GTK main loop) ──

#[cfg(target_os = "linux")]
pub struct TrayManager;

#[cfg(target_os = "linux")]
impl TrayManager {
    pub fn new(
        _guard: GuardHandle,
        _dashboard_url: String,
        _on_window_action: impl Fn(ShellAction) + Send + 'static,
    ) -> Result<Self, String> {
        Err("system tray is not supported on Linux".to_string())
    }

    pub fn update(&mut self, _snapshot: &GuardSnapshot) {}
}
