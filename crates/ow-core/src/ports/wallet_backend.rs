use async_trait::async_trait;
use tokio::sync::watch;

use crate::wallet::{BackendStatus, CommsConfig, WalletError, WalletHandle};

#[async_trait]
pub trait WalletBackendPort: Send + Sync {
    async fn connect(&self, config: &CommsConfig) -> Result<WalletHandle, WalletError>;
    async fn disconnect(&self, handle: WalletHandle) -> anyhow::Result<()>;

    /// Connectivity and sync status published by the backend.
    fn status(&self) -> watch::Receiver<BackendStatus>;
}
