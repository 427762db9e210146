use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::transport::{ConnectionFailure, ControlEvent, TransportError};

/// Opens one connection to the proxy's control endpoint. Retrying is the
/// caller's job.
#[async_trait]
pub trait ControlChannelConnectorPort: Send + Sync {
    async fn connect(
        &self,
        endpoint: SocketAddr,
    ) -> Result<Arc<dyn ControlChannelPort>, ConnectionFailure>;
}

/// An open control connection.
#[async_trait]
pub trait ControlChannelPort: Send + Sync {
    async fn authenticate(&self, cookie: &[u8]) -> Result<(), TransportError>;

    /// Tie the proxy's lifetime to this connection.
    async fn take_ownership(&self) -> Result<(), TransportError>;

    async fn set_config(&self, key: &str, value: &str) -> Result<(), TransportError>;

    /// Subscribe to status events. Only one subscription per connection.
    ///
    /// The current bootstrap phase and circuit state are delivered first, so
    /// progress reached before subscribing is not lost. The stream ends with
    /// [`ControlEvent::ChannelClosed`] when the connection drops.
    async fn subscribe(&self) -> Result<mpsc::Receiver<ControlEvent>, TransportError>;

    /// Close the connection without waiting for the proxy.
    async fn disconnect(&self);
}
