//! Authenticated control connection to the running proxy.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ow_core::ports::{ControlChannelConnectorPort, ControlChannelPort};
use ow_core::transport::{ControlEvent, TransportError};

pub const DISABLE_NETWORK: &str = "DisableNetwork";

pub struct ControlChannelClient {
    channel: Arc<dyn ControlChannelPort>,
}

impl ControlChannelClient {
    /// Connect with a retry budget, waiting `retry_delay` between attempts.
    ///
    /// On exhaustion the last connection failure is returned, with its OS
    /// error classification intact.
    pub async fn connect(
        connector: &dyn ControlChannelConnectorPort,
        endpoint: SocketAddr,
        retry_budget: u32,
        retry_delay: Duration,
    ) -> Result<Self, TransportError> {
        let attempts = retry_budget.max(1);
        let mut attempt = 1;

        loop {
            match connector.connect(endpoint).await {
                Ok(channel) => {
                    debug!(%endpoint, attempt, "control channel connected");
                    return Ok(Self { channel });
                }
                Err(failure) if attempt < attempts => {
                    debug!(%endpoint, attempt, attempts, error = %failure, "control channel not reachable yet");
                    tokio::time::sleep(retry_delay).await;
                    attempt += 1;
                }
                Err(failure) => {
                    warn!(%endpoint, attempts, error = %failure, "control channel connect budget exhausted");
                    return Err(TransportError::ConnectionFailed(failure));
                }
            }
        }
    }

    pub fn from_channel(channel: Arc<dyn ControlChannelPort>) -> Self {
        Self { channel }
    }

    pub async fn authenticate(&self, cookie: &[u8]) -> Result<(), TransportError> {
        self.channel.authenticate(cookie).await?;
        debug!("control channel authenticated");
        Ok(())
    }

    pub async fn take_ownership(&self) -> Result<(), TransportError> {
        self.channel.take_ownership().await
    }

    pub async fn set_config(&self, key: &str, value: &str) -> Result<(), TransportError> {
        self.channel.set_config(key, value).await
    }

    pub async fn subscribe(&self) -> Result<mpsc::Receiver<ControlEvent>, TransportError> {
        self.channel.subscribe().await
    }

    /// Toggle the network off and on so the proxy renegotiates circuits
    /// without restarting.
    pub async fn kick_network(&self) -> Result<(), TransportError> {
        info!("toggling transport network to force fresh circuits");
        self.set_config(DISABLE_NETWORK, "1").await?;
        self.set_config(DISABLE_NETWORK, "0").await
    }

    pub async fn disconnect(&self) {
        self.channel.disconnect().await;
    }
}
