//! Application configuration DTO.
//!
//! Maps the TOML config file onto [`AppConfig`]. Values absent from the file
//! keep whatever the base config (usually [`AppConfig::with_system_defaults`])
//! already holds. No validation happens here.

use std::path::PathBuf;
use std::time::Duration;

use crate::transport::launch::{DEFAULT_CONTROL_PORT, DEFAULT_SOCKS_PORT};
use crate::transport::TransportConfig;
use crate::wallet::{DEFAULT_DISCOVERY_TIMEOUT, DEFAULT_SAF_MESSAGE_DURATION};

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_CONTROL_CONNECT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Proxy executable (looked up on `PATH` when relative).
    pub tor_binary: PathBuf,

    /// Pluggable-transport helper executable, if one is installed.
    pub pluggable_transport_binary: Option<PathBuf>,

    pub control_port: u16,
    pub socks_port: u16,
    pub shutdown_timeout: Duration,
    pub retry_delay: Duration,
    pub control_connect_attempts: u32,

    pub discovery_timeout: Duration,
    pub saf_message_duration: Duration,

    /// Root for the proxy working directory, wallet databases and settings.
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Config with system-default values rooted at `data_dir`.
    pub fn with_system_defaults(data_dir: PathBuf) -> Self {
        Self {
            tor_binary: PathBuf::from("tor"),
            pluggable_transport_binary: None,
            control_port: DEFAULT_CONTROL_PORT,
            socks_port: DEFAULT_SOCKS_PORT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            control_connect_attempts: DEFAULT_CONTROL_CONNECT_ATTEMPTS,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            saf_message_duration: DEFAULT_SAF_MESSAGE_DURATION,
            data_dir,
        }
    }

    /// Overlay the values present in `toml_value` on top of `base`.
    pub fn from_toml(toml_value: &toml::Value, base: AppConfig) -> anyhow::Result<Self> {
        let transport = toml_value.get("transport");
        let wallet = toml_value.get("wallet");
        let storage = toml_value.get("storage");

        let str_at = |section: Option<&toml::Value>, key: &str| {
            section
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let int_at = |section: Option<&toml::Value>, key: &str| {
            section.and_then(|s| s.get(key)).and_then(|v| v.as_integer())
        };
        let secs_at = |section: Option<&toml::Value>, key: &str| {
            int_at(section, key).map(|v| Duration::from_secs(v.max(0) as u64))
        };

        Ok(Self {
            tor_binary: str_at(transport, "tor_binary")
                .map(PathBuf::from)
                .unwrap_or(base.tor_binary),
            pluggable_transport_binary: str_at(transport, "pluggable_transport_binary")
                .map(PathBuf::from)
                .or(base.pluggable_transport_binary),
            control_port: int_at(transport, "control_port")
                .map(|v| v as u16)
                .unwrap_or(base.control_port),
            socks_port: int_at(transport, "socks_port")
                .map(|v| v as u16)
                .unwrap_or(base.socks_port),
            shutdown_timeout: secs_at(transport, "shutdown_timeout_secs")
                .unwrap_or(base.shutdown_timeout),
            retry_delay: secs_at(transport, "retry_delay_secs").unwrap_or(base.retry_delay),
            control_connect_attempts: int_at(transport, "control_connect_attempts")
                .map(|v| v as u32)
                .unwrap_or(base.control_connect_attempts),
            discovery_timeout: secs_at(wallet, "discovery_timeout_secs")
                .unwrap_or(base.discovery_timeout),
            saf_message_duration: secs_at(wallet, "saf_message_duration_secs")
                .unwrap_or(base.saf_message_duration),
            data_dir: str_at(storage, "data_dir")
                .map(PathBuf::from)
                .unwrap_or(base.data_dir),
        })
    }

    pub fn transport_dir(&self) -> PathBuf {
        self.data_dir.join("tor")
    }

    pub fn wallet_root(&self) -> PathBuf {
        self.data_dir.join("wallet")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn passphrase_path(&self) -> PathBuf {
        self.data_dir.join("passphrase")
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            data_dir: self.transport_dir(),
            control_port: self.control_port,
            socks_port: self.socks_port,
        }
    }
}
