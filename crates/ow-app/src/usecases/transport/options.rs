use std::time::Duration;

use ow_core::config::{
    AppConfig, DEFAULT_CONTROL_CONNECT_ATTEMPTS, DEFAULT_RETRY_DELAY, DEFAULT_SHUTDOWN_TIMEOUT,
};
use ow_core::transport::TransportConfig;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Timing and endpoint settings for the transport orchestrator.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub transport: TransportConfig,
    /// Control-channel connection attempts per start.
    pub connect_attempts: u32,
    pub connect_retry_delay: Duration,
    /// Delay before a stalled bootstrap gets kicked.
    pub retry_delay: Duration,
    /// How often `stop()` checks whether the process has exited.
    pub poll_interval: Duration,
    /// Upper bound on that wait before the process is abandoned.
    pub shutdown_timeout: Duration,
    /// Pid the proxy should treat as its owning controller.
    pub owning_process: Option<u32>,
}

impl TransportOptions {
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            connect_attempts: DEFAULT_CONTROL_CONNECT_ATTEMPTS,
            connect_retry_delay: DEFAULT_POLL_INTERVAL,
            retry_delay: DEFAULT_RETRY_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            owning_process: None,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            connect_attempts: config.control_connect_attempts,
            retry_delay: config.retry_delay,
            shutdown_timeout: config.shutdown_timeout,
            owning_process: Some(std::process::id()),
            ..Self::new(config.transport_config())
        }
    }
}
