use thiserror::Error;

/// Wallet backend connect failures, classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// The stored local passphrase does not open the wallet database.
    #[error("wallet passphrase rejected")]
    BadPassphrase,

    #[error("transport is not available")]
    TransportUnavailable,

    #[error("a wallet start is already in progress")]
    StartInProgress,

    /// The wallet was disconnected while the start was still running.
    #[error("wallet start cancelled by a disconnect")]
    Cancelled,

    #[error("wallet backend error: {0}")]
    Backend(String),
}

impl WalletError {
    pub fn is_bad_passphrase(&self) -> bool {
        matches!(self, WalletError::BadPassphrase)
    }
}

impl From<anyhow::Error> for WalletError {
    fn from(err: anyhow::Error) -> Self {
        WalletError::Backend(format!("{err:#}"))
    }
}
