use async_trait::async_trait;

use crate::transport::{BridgeConfiguration, PluggableTransport};

#[async_trait]
pub trait PluggableTransportPort: Send + Sync {
    /// Registrations to pass to the proxy for the given bridges.
    fn registrations(&self, bridges: &BridgeConfiguration) -> Vec<PluggableTransport>;

    /// Bring the helper up after the proxy has been launched.
    async fn start(&self) -> anyhow::Result<()>;
}
