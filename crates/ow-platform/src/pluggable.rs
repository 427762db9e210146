//! Pluggable-transport helper registrations.
//!
//! The helper binary runs in managed (`exec`) mode: the proxy spawns and
//! supervises it, so starting it here only checks that it can be launched.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use ow_core::ports::PluggableTransportPort;
use ow_core::transport::{BridgeConfiguration, PluggableTransport};

/// Transport names served by a lyrebird/obfs4proxy style helper.
const SUPPORTED_TRANSPORTS: &[&str] = &[
    "obfs2",
    "obfs3",
    "obfs4",
    "meek_lite",
    "scramblesuit",
    "webtunnel",
];

pub struct ExecPluggableTransports {
    binary: Option<PathBuf>,
}

impl ExecPluggableTransports {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }
}

#[async_trait]
impl PluggableTransportPort for ExecPluggableTransports {
    fn registrations(&self, bridges: &BridgeConfiguration) -> Vec<PluggableTransport> {
        let requested = bridges.transport_names();
        if requested.is_empty() {
            return Vec::new();
        }

        let Some(binary) = &self.binary else {
            warn!(transports = ?requested, "bridges need a pluggable transport but none is configured");
            return Vec::new();
        };

        let (names, unsupported): (Vec<String>, Vec<String>) = requested
            .into_iter()
            .partition(|name| SUPPORTED_TRANSPORTS.contains(&name.as_str()));
        if !unsupported.is_empty() {
            warn!(transports = ?unsupported, "ignoring unsupported pluggable transports");
        }
        if names.is_empty() {
            return Vec::new();
        }

        vec![PluggableTransport {
            names,
            endpoint: format!("exec {}", binary.display()),
        }]
    }

    async fn start(&self) -> anyhow::Result<()> {
        let Some(binary) = &self.binary else {
            debug!("no pluggable transport binary configured");
            return Ok(());
        };

        let metadata = tokio::fs::metadata(binary)
            .await
            .with_context(|| format!("pluggable transport binary {}", binary.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("pluggable transport binary {} is not a file", binary.display());
        }
        info!(binary = %binary.display(), "pluggable transport helper managed by the proxy");
        Ok(())
    }
}
