//! # Configuration Loader
//!
//! Reads the optional TOML file and overlays it on the system defaults.
//! Values are taken as they are; nothing is validated here.

use std::path::Path;

use anyhow::Context;
use ow_core::app_dirs::AppDirs;
use ow_core::config::AppConfig;
use ow_core::ports::AppDirsPort;
use ow_platform::app_dirs::DirsAppDirsAdapter;

pub fn resolve_app_dirs() -> anyhow::Result<AppDirs> {
    DirsAppDirsAdapter::new()
        .get_app_dirs()
        .context("Failed to resolve application directories")
}

/// Load configuration, falling back to defaults rooted at the application
/// data directory when no file is given.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML.
pub fn load_config(config_path: Option<&Path>, app_dirs: &AppDirs) -> anyhow::Result<AppConfig> {
    let base = AppConfig::with_system_defaults(app_dirs.app_data_root.clone());
    let Some(config_path) = config_path else {
        return Ok(base);
    };

    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value, base)
}
