//! User-facing notifications for guard transitions

use std::sync::mpsc;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::settings::NotificationLevel;
use crate::APP_NAME;

/// Transient message emitted by the guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Automatic pause, with the process that triggered it
    Paused { trigger: Option<String> },
    /// Automatic resume
    Resumed,
    ManualPause,
    ManualResume,
}

impl Notification {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Paused { .. } | Self::ManualPause => "Paused",
            Self::Resumed | Self::ManualResume => "Resumed",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::Paused { trigger: Some(name) } => {
                format!("Paused - heavy app detected ({})", name)
            }
            Self::Paused { trigger: None } => "Paused - heavy app detected".to_string(),
            Self::Resumed => "Resumed - system free".to_string(),
            Self::ManualPause => "Daemon paused from the agent".to_string(),
            Self::ManualResume => "Daemon resumed from the agent".to_string(),
        }
    }

    /// Whether this came from the automatic controller
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Paused { .. } | Self::Resumed)
    }

    /// Check this notification against a user-selected level
    pub fn is_enabled(&self, level: NotificationLevel) -> bool {
        match level {
            NotificationLevel::All => true,
            NotificationLevel::Important => self.is_transition(),
            NotificationLevel::None => false,
        }
    }
}

/// Sink for guard notifications. Must not block the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Writes notifications to the log only
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        info!("{}", notification.body());
    }
}

/// Native desktop notifications (balloon / notification center)
pub struct DesktopNotifier {
    level: NotificationLevel,
}

impl DesktopNotifier {
    pub fn new(level: NotificationLevel) -> Self {
        Self { level }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) {
        if !notification.is_enabled(self.level) {
            return;
        }

        let summary = format!("{} - {}", APP_NAME, notification.title());
        let body = notification.body();
        // Showing can block on the platform notification service
        std::thread::spawn(move || {
            if let Err(e) = notify_rust::Notification::new()
                .summary(&summary)
                .body(&body)
                .appname(APP_NAME)
                .show()
            {
                warn!("Failed to show desktop notification: {}", e);
            }
        });
    }
}

/// Forwards notifications to another thread, e.g. the UI thread
pub struct ChannelNotifier {
    sender: mpsc::Sender<Notification>,
    wake: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ChannelNotifier {
    pub fn new(sender: mpsc::Sender<Notification>) -> Self {
        Self { sender, wake: None }
    }

    /// Run `wake` after every send so the receiver notices promptly
    pub fn with_wake(mut self, wake: impl Fn() + Send + Sync + 'static) -> Self {
        self.wake = Some(Box::new(wake));
        self
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: &Notification) {
        if self.sender.send(notification.clone()).is_err() {
            debug!("Notification receiver dropped");
            return;
        }
        if let Some(wake) = &self.wake {
            wake();
        }
    }
}

/// Fans one notification out to several sinks
#[derive(Default, Clone)]
pub struct Notifiers {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Notifier for Notifiers {
    fn notify(&self, notification: &Notification) {
        for sink in &self.sinks {
            sink.notify(notification);
        }
    }
}
