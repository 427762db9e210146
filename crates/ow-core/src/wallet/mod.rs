//! Wallet lifecycle domain: state, connect configuration, networks.

pub mod comms;
pub mod error;
pub mod network;
pub mod state;

pub use comms::{CommsConfig, WalletHandle, DEFAULT_DISCOVERY_TIMEOUT, DEFAULT_SAF_MESSAGE_DURATION};
pub use error::WalletError;
pub use network::{Network, UnknownNetwork};
pub use state::{BackendConnectivity, BackendStatus, SyncStatus, WalletState};
