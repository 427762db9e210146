use async_trait::async_trait;

use crate::security::SecretString;

/// Source of the local wallet database passphrase.
#[async_trait]
pub trait PassphrasePort: Send + Sync {
    /// `None` when no passphrase has been set up.
    async fn load(&self) -> anyhow::Result<Option<SecretString>>;
}
