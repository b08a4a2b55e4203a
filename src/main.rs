//! OmniSky agent - Keeps the OmniSky daemon out of the way of heavy apps
//!
//! Watches the process table for user-configured heavy workloads (games,
//! renderers, editors) and asks the local daemon to pause while one runs,
//! resuming it once the machine is free again.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod core;
mod persistence;
mod ui;

use std::path::PathBuf;
use std::sync::{mpsc, Arc, OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use single_instance::SingleInstance;
use tracing::{error, info};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::core::notifier::ChannelNotifier;
use crate::core::{AppState, Notifier, Settings};
use crate::persistence::SettingsFile;
use crate::ui::GuardApp;

/// Application name constant
pub const APP_NAME: &str = "OmniSky";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pauses the OmniSky daemon while heavy applications run
#[derive(Parser, Debug)]
#[command(name = "omnisky-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run the monitor without status window or tray icon (Ctrl-C to stop)
    #[arg(long)]
    headless: bool,

    /// Settings file to use instead of the per-user default
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Daemon control API base URL for this run
    #[arg(long, value_name = "URL")]
    daemon_url: Option<String>,

    /// Sampling interval in milliseconds for this run
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    print_config: bool,
}

const DEFAULT_FILTER: &str = "omnisky_agent=info,eframe=warn,egui=warn,wgpu=error";
const DEBUG_FILTER: &str = "omnisky_agent=debug,eframe=warn,egui=warn,wgpu=error";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn main() -> Result<()> {
    let args = Args::parse();
    // Before settings load so its warnings are not lost
    let log_filter = init_logging();

    let settings_file = match &args.config {
        Some(path) => SettingsFile::new(path),
        None => SettingsFile::default_location()?,
    };
    let mut settings = settings_file
        .load_or_create()
        .with_context(|| format!("Failed to load {}", settings_file.path().display()))?;
    apply_overrides(&mut settings, &args);

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    if settings.debug_logging && std::env::var_os("RUST_LOG").is_none() {
        enable_debug_logging(&log_filter);
    }
    info!("{} agent v{} starting...", APP_NAME, APP_VERSION);
    info!("Settings: {}", settings_file.path().display());

    // Two agents would fight over the daemon
    let instance =
        SingleInstance::new(APP_NAME).context("Failed to create single instance lock")?;
    if !instance.is_single() {
        error!("Another instance of {} is already running!", APP_NAME);
        show_already_running();
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("omnisky-worker")
        .build()
        .context("Failed to start async runtime")?;

    if args.headless {
        run_headless(runtime, settings, settings_file)
    } else {
        run_gui(runtime, settings, settings_file)
    }
}

/// Command-line values win over the settings file but are not saved
fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(url) = &args.daemon_url {
        settings.daemon_url = url.clone();
        // The dashboard follows an overridden daemon
        settings.dashboard_url = String::new();
    }
    if let Some(ms) = args.interval_ms {
        settings.monitor_interval_ms = ms;
    }
    settings.validate();
}

fn run_headless(
    runtime: tokio::runtime::Runtime,
    settings: Settings,
    settings_file: SettingsFile,
) -> Result<()> {
    let (_state, task) = AppState::start(runtime.handle().clone(), settings, settings_file, None)?;
    info!("Running headless, press Ctrl-C to stop");

    runtime.block_on(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
        task.shutdown().await;
    });

    info!("{} shutting down", APP_NAME);
    Ok(())
}

fn run_gui(
    runtime: tokio::runtime::Runtime,
    settings: Settings,
    settings_file: SettingsFile,
) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let repaint: Arc<OnceLock<egui::Context>> = Arc::new(OnceLock::new());
    let ui_notifier = {
        let repaint = Arc::clone(&repaint);
        ChannelNotifier::new(tx).with_wake(move || {
            if let Some(ctx) = repaint.get() {
                ctx.request_repaint();
            }
        })
    };
    let ui_notifier: Arc<dyn Notifier> = Arc::new(ui_notifier);

    let (state, task) = AppState::start(
        runtime.handle().clone(),
        settings,
        settings_file,
        Some(ui_notifier),
    )?;
    let status = state.watch_daemon_status(task.cancellation_token());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 560.0])
            .with_min_inner_size([560.0, 420.0])
            .with_icon(ui::icon::app_icon()),
        ..Default::default()
    };

    info!("Starting GUI...");
    let result = eframe::run_native(
        &format!("{} v{}", APP_NAME, APP_VERSION),
        native_options,
        Box::new(move |cc| Ok(Box::new(GuardApp::new(cc, state, status, rx, repaint)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e));

    runtime.block_on(task.shutdown());
    info!("{} shutting down", APP_NAME);
    result
}

/// Initialize the logging system. `RUST_LOG` wins over the default filter.
fn init_logging() -> FilterHandle {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (filter, handle) = reload::Layer::new(filter);

    // stderr keeps `--print-config` output clean
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

/// Raise the crate's log level once settings ask for it
fn enable_debug_logging(handle: &FilterHandle) {
    if let Err(e) = handle.modify(|filter| *filter = EnvFilter::new(DEBUG_FILTER)) {
        error!("Failed to enable debug logging: {}", e);
    }
}

/// Tell the user another agent is already running
fn show_already_running() {
    eprintln!("{} is already running!", APP_NAME);
    if let Err(e) = notify_rust::Notification::new()
        .summary(APP_NAME)
        .body(&format!("{} is already running", APP_NAME))
        .appname(APP_NAME)
        .show()
    {
        error!("Failed to show notification: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_and_validate() {
        let args = Args::parse_from([
            "omnisky-agent",
            "--daemon-url",
            "http://127.0.0.1:9000/",
            "--interval-ms",
            "10",
        ]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &args);

        assert_eq!(settings.daemon_url, "http://127.0.0.1:9000");
        assert_eq!(settings.dashboard_url, "http://127.0.0.1:9000");
        assert_eq!(settings.monitor_interval_ms, 250);
    }

    #[test]
    fn debug_logging_raises_crate_filter() {
        let (_layer, handle) =
            reload::Layer::<EnvFilter, Registry>::new(EnvFilter::new(DEFAULT_FILTER));
        let directives =
            |h: &FilterHandle| h.with_current(|f| f.to_string().to_lowercase()).unwrap();
        assert!(directives(&handle).contains("omnisky_agent=info"));

        enable_debug_logging(&handle);
        let current = directives(&handle);
        assert!(current.contains("omnisky_agent=debug"));
        assert!(current.contains("wgpu=error"));
    }

    #[test]
    fn no_flags_keep_settings() {
        let args = Args::parse_from(["omnisky-agent"]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &args);
        assert_eq!(settings, Settings::default());
    }
}
