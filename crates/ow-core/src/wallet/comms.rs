use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::security::SecretString;

use super::network::Network;

pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_SAF_MESSAGE_DURATION: Duration = Duration::from_secs(3 * 60 * 60);

/// Configuration handed to the wallet backend's `connect`.
pub struct CommsConfig {
    pub network: Network,
    pub database_dir: PathBuf,
    pub database_name: String,
    pub discovery_timeout: Duration,
    pub saf_message_duration: Duration,
    pub public_address: String,
    pub socks_endpoint: SocketAddr,
    pub control_endpoint: SocketAddr,
    pub control_cookie_path: PathBuf,
    pub passphrase: Option<SecretString>,
}

impl CommsConfig {
    /// Same configuration with the passphrase removed.
    pub fn without_passphrase(mut self) -> Self {
        self.passphrase = None;
        self
    }
}

impl fmt::Debug for CommsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommsConfig")
            .field("network", &self.network)
            .field("database_dir", &self.database_dir)
            .field("database_name", &self.database_name)
            .field("discovery_timeout", &self.discovery_timeout)
            .field("saf_message_duration", &self.saf_message_duration)
            .field("public_address", &self.public_address)
            .field("socks_endpoint", &self.socks_endpoint)
            .field("control_endpoint", &self.control_endpoint)
            .field("has_passphrase", &self.passphrase.is_some())
            .finish()
    }
}

/// Opaque handle returned by a successful backend connect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WalletHandle {
    pub id: uuid::Uuid,
    pub network: Network,
}

impl WalletHandle {
    pub fn new(network: Network) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            network,
        }
    }
}
