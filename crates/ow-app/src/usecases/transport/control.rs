use async_trait::async_trait;
use tokio::sync::watch;

use ow_core::transport::{TransportError, TransportSnapshot};

/// Start/stop surface of the transport, as seen by the wallet lifecycle
/// and the bridge use case.
#[async_trait]
pub trait TransportControl: Send + Sync {
    async fn start(&self) -> Result<(), TransportError>;
    async fn stop(&self) -> Result<(), TransportError>;
    /// Stop then start as one transition, so a queued restart is never
    /// collapsed into a start of an already running transport.
    async fn restart(&self) -> Result<(), TransportError>;
    fn subscribe(&self) -> watch::Receiver<TransportSnapshot>;
}
