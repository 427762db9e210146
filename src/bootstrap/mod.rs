pub mod commands;
pub mod config;
pub mod run;
pub mod tracing;
pub mod wiring;

pub use config::{load_config, resolve_app_dirs};
pub use run::run_daemon;
pub use wiring::{wire_dependencies, AppRuntime};
