//! Application state - Wiring of settings, controller and daemon status

use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::client::{DaemonStatus, HttpControlClient};
use super::controller::{Controller, ControllerTask, GuardHandle};
use super::detector::{HeavyWorkloadSet, ProcessDetector};
use super::guard::{DebouncePolicy, Guard};
use super::notifier::{DesktopNotifier, LogNotifier, Notifier, Notifiers};
use super::settings::Settings;
use crate::persistence::SettingsFile;

/// Latest result of polling the daemon's `/status`
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub status: Option<DaemonStatus>,
    /// Why the last poll failed
    pub error: Option<String>,
    pub checked_at: Option<DateTime<Local>>,
}

impl StatusReport {
    pub fn is_reachable(&self) -> bool {
        self.error.is_none() && self.status.is_some()
    }
}

/// Central application state shared with the presentation shell
pub struct AppState {
    /// Settings as edited in the UI; the controller keeps the values it
    /// was started with
    pub settings: Arc<RwLock<Settings>>,
    pub settings_file: Arc<SettingsFile>,
    /// Control surface of the running controller
    pub guard: GuardHandle,
    /// Patterns the running detector was built with; edits apply on restart
    watched: Vec<String>,
    client: Arc<HttpControlClient>,
    runtime: Handle,
}

impl AppState {
    /// Build detector, client and notifiers from settings and start the
    /// monitor loop on `runtime`
    pub fn start(
        runtime: Handle,
        settings: Settings,
        settings_file: SettingsFile,
        ui_notifier: Option<Arc<dyn Notifier>>,
    ) -> Result<(Self, ControllerTask)> {
        let client = HttpControlClient::new(&settings.daemon_url, settings.request_timeout())
            .context("Failed to create daemon control client")?
            .with_finish_current_job(settings.finish_current_job);
        let client = Arc::new(client);

        let workloads = HeavyWorkloadSet::new(&settings.heavy_processes);
        info!("Watching for heavy workloads: {:?}", workloads.patterns());
        let detector = ProcessDetector::new(workloads);
        let watched = detector.workloads().patterns().to_vec();

        let notifiers = Notifiers::new().with(Arc::new(DesktopNotifier::new(
            settings.notification_level,
        )));
        // Without a window the log is the only place notifications show up
        let notifiers = match ui_notifier {
            Some(ui) => notifiers.with(ui),
            None => notifiers.with(Arc::new(LogNotifier)),
        };

        let guard = Guard::new(DebouncePolicy {
            confirm_samples: settings.confirm_samples,
            resume_cooldown: settings.resume_cooldown(),
        });
        let controller = Controller::new(
            guard,
            Box::new(detector),
            client.clone(),
            Arc::new(notifiers),
        );

        let task = {
            let _entered = runtime.enter();
            controller.spawn(settings.monitor_interval())
        };

        let state = Self {
            settings: Arc::new(RwLock::new(settings)),
            settings_file: Arc::new(settings_file),
            guard: task.handle(),
            watched,
            client,
            runtime,
        };
        Ok((state, task))
    }

    /// Poll the daemon's `/status` until `cancel` fires
    pub fn watch_daemon_status(&self, cancel: CancellationToken) -> watch::Receiver<StatusReport> {
        let (tx, rx) = watch::channel(StatusReport::default());
        let client = Arc::clone(&self.client);
        let interval = self
            .settings
            .read()
            .map(|s| s.status_poll_interval())
            .unwrap_or_else(|_| Settings::default().status_poll_interval());

        self.runtime.spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let report = match client.fetch_status().await {
                    Ok(status) => StatusReport {
                        status: Some(status),
                        error: None,
                        checked_at: Some(Local::now()),
                    },
                    Err(e) => {
                        debug!("Status poll failed: {}", e);
                        StatusReport {
                            status: None,
                            error: Some(e.to_string()),
                            checked_at: Some(Local::now()),
                        }
                    }
                };
                if tx.send(report).is_err() {
                    break;
                }
            }
        });

        rx
    }

    pub fn daemon_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn dashboard_url(&self) -> String {
        self.settings
            .read()
            .map(|s| s.dashboard_url.clone())
            .unwrap_or_else(|_| self.daemon_url().to_string())
    }

    /// Patterns in effect for this run
    pub fn watched_patterns(&self) -> &[String] {
        &self.watched
    }

    /// Patterns as edited in settings
    pub fn heavy_processes(&self) -> Vec<String> {
        self.settings
            .read()
            .map(|s| s.heavy_processes.clone())
            .unwrap_or_default()
    }

    /// Persist the edited settings
    pub fn save_settings(&self) -> Result<()> {
        let mut settings = self
            .settings
            .write()
            .map_err(|e| anyhow::anyhow!("Settings lock poisoned: {}", e))?;
        settings.validate();
        self.settings_file.save(&settings)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GuardState;

    #[test]
    fn start_runs_controller_and_saves_settings() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            daemon_url: "http://127.0.0.1:9".to_string(),
            heavy_processes: vec!["a-process-name-that-should-never-exist-0xdeadbeef".into()],
            notification_level: crate::core::settings::NotificationLevel::None,
            ..Default::default()
        };

        let (state, task) = AppState::start(
            runtime.handle().clone(),
            settings,
            SettingsFile::new(dir.path().join("settings.json")),
            None,
        )
        .unwrap();

        assert_eq!(state.guard.current_state(), GuardState::Free);
        assert_eq!(state.daemon_url(), "http://127.0.0.1:9");

        state.settings.write().unwrap().monitor_interval_ms = 5000;
        state.save_settings().unwrap();
        let saved = state.settings_file.load().unwrap().unwrap();
        assert_eq!(saved.monitor_interval_ms, 5000);

        runtime.block_on(task.shutdown());
    }

    #[test]
    fn watched_patterns_stay_fixed_until_restart() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            daemon_url: "http://127.0.0.1:9".to_string(),
            heavy_processes: vec!["Blender ".into(), "  ".into()],
            notification_level: crate::core::settings::NotificationLevel::None,
            ..Default::default()
        };
        let (state, task) = AppState::start(
            runtime.handle().clone(),
            settings,
            SettingsFile::new(dir.path().join("settings.json")),
            None,
        )
        .unwrap();
        assert_eq!(state.watched_patterns(), ["blender"]);

        state.settings.write().unwrap().heavy_processes = vec!["premiere".into()];
        state.save_settings().unwrap();
        assert_eq!(state.heavy_processes(), vec!["premiere".to_string()]);
        assert_eq!(state.watched_patterns(), ["blender"]);

        runtime.block_on(task.shutdown());
    }

    #[test]
    fn unreachable_daemon_reports_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            daemon_url: "http://127.0.0.1:9".to_string(),
            heavy_processes: vec![],
            notification_level: crate::core::settings::NotificationLevel::None,
            ..Default::default()
        };
        let (state, task) = AppState::start(
            runtime.handle().clone(),
            settings,
            SettingsFile::new(dir.path().join("settings.json")),
            None,
        )
        .unwrap();

        let cancel = task.cancellation_token();
        let mut reports = state.watch_daemon_status(cancel);
        runtime.block_on(async {
            time::timeout(
                std::time::Duration::from_secs(5),
                reports.wait_for(|r| r.checked_at.is_some()),
            )
            .await
            .expect("first poll")
            .expect("poller alive");
        });
        assert!(!reports.borrow().is_reachable());

        runtime.block_on(task.shutdown());
    }
}
