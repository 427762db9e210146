use serde::{Deserialize, Serialize};

use super::error::WalletError;

/// Unified wallet lifecycle state published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WalletState {
    #[default]
    NotReady,
    Starting,
    Started,
    StartFailed(WalletError),
}

impl WalletState {
    /// Whether `start_wallet()` may be invoked from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, WalletState::NotReady | WalletState::StartFailed(_))
    }
}

/// Connectivity reported by the wallet backend itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendConnectivity {
    #[default]
    Offline,
    Connecting,
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Synced,
    Failed,
}

/// Status stream item published by the wallet backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendStatus {
    pub connectivity: BackendConnectivity,
    pub sync: SyncStatus,
}

impl BackendStatus {
    pub fn is_connected(&self) -> bool {
        self.connectivity == BackendConnectivity::Online
    }
}
