use async_trait::async_trait;

use crate::transport::{LaunchParameters, TransportError};

/// Lifetime of the proxy process.
///
/// Stopping is not part of this port: the orchestrator closes the control
/// channel (the proxy exits when its owning controller goes away) and polls
/// [`is_active`](TransportProcessPort::is_active).
#[async_trait]
pub trait TransportProcessPort: Send + Sync {
    /// Create the working directory and the onion-auth directory.
    async fn prepare_directories(&self) -> anyhow::Result<()>;

    /// Spawn the process. Calling this while a process is active is an error.
    async fn start(&self, params: LaunchParameters) -> anyhow::Result<()>;

    fn is_active(&self) -> bool;

    /// Read the control-channel authentication cookie from the working directory.
    async fn read_auth_cookie(&self) -> Result<Vec<u8>, TransportError>;

    /// Force-terminate a process that did not exit after the shutdown wait.
    async fn abandon(&self);
}
