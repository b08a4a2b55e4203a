//! Core module - Detection, guard state machine, daemon control

mod app_state;
pub mod client;
pub mod controller;
pub mod detector;
pub mod error;
pub mod guard;
pub mod notifier;
pub mod settings;

pub use app_state::{AppState, StatusReport};
pub use controller::{GuardHandle, GuardSnapshot};
pub use guard::GuardState;
pub use notifier::{Notification, Notifier};
pub use settings::Settings;
