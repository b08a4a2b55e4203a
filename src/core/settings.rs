//! Agent settings management

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
    System,
}

impl Theme {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
            Self::System => "System",
        }
    }
}

/// Which guard events produce a desktop notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NotificationLevel {
    /// Automatic transitions and manual pause/resume acknowledgements
    All,
    /// Automatic transitions only
    #[default]
    Important,
    None,
}

impl NotificationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Important => "Transitions Only",
            Self::None => "None",
        }
    }

    pub fn all() -> &'static [NotificationLevel] {
        &[
            NotificationLevel::All,
            NotificationLevel::Important,
            NotificationLevel::None,
        ]
    }
}

/// Agent settings, persisted as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Daemon
    /// Base URL of the daemon control API
    pub daemon_url: String,
    /// Dashboard opened from the tray / status window
    pub dashboard_url: String,
    /// Client-side timeout for control requests (ms)
    pub request_timeout_ms: u64,
    /// Forwarded as `finish_current_job` on pause requests when set
    pub finish_current_job: Option<bool>,

    // Detection
    /// Case-insensitive substrings that mark a process as heavy
    pub heavy_processes: Vec<String>,
    /// Timer period of the monitor loop (ms)
    pub monitor_interval_ms: u64,
    /// Consecutive opposite verdicts required before a transition
    pub confirm_samples: u32,
    /// Minimum time spent paused before an automatic resume (seconds)
    pub resume_cooldown_secs: u64,

    // Presentation
    pub notification_level: NotificationLevel,
    pub theme: Theme,
    /// Poll interval of the daemon `/status` endpoint in the status window (ms)
    pub status_poll_interval_ms: u64,
    /// Start with the status window hidden behind the tray icon
    pub start_minimized: bool,

    // Advanced
    pub debug_logging: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daemon_url: "http://127.0.0.1:8000".to_string(),
            dashboard_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_ms: 3000,
            finish_current_job: None,

            heavy_processes: ["GTA5", "Cyberpunk2077", "RDR2", "blender", "premiere"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            monitor_interval_ms: 3000,
            confirm_samples: 1,
            resume_cooldown_secs: 0,

            notification_level: NotificationLevel::Important,
            theme: Theme::Dark,
            status_poll_interval_ms: 5000,
            start_minimized: false,

            debug_logging: false,
        }
    }
}

impl Settings {
    /// Validate settings and fix any invalid values
    pub fn validate(&mut self) {
        self.daemon_url = self.daemon_url.trim().trim_end_matches('/').to_string();
        if self.daemon_url.is_empty() {
            self.daemon_url = Settings::default().daemon_url;
        }
        if self.dashboard_url.trim().is_empty() {
            self.dashboard_url = self.daemon_url.clone();
        }
        self.request_timeout_ms = self.request_timeout_ms.clamp(1_000, 30_000);
        self.monitor_interval_ms = self.monitor_interval_ms.max(250);
        self.confirm_samples = self.confirm_samples.max(1);
        self.status_poll_interval_ms = self.status_poll_interval_ms.max(1_000);
        self.heavy_processes.retain(|p| !p.trim().is_empty());
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn resume_cooldown(&self) -> Duration {
        Duration::from_secs(self.resume_cooldown_secs)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }
}
