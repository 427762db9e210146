use async_trait::async_trait;

use crate::transport::NetworkCapability;

#[async_trait]
pub trait NetworkProbePort: Send + Sync {
    /// Never fails; an inconclusive probe reports `Unknown`.
    async fn probe(&self) -> NetworkCapability;
}
