use std::path::PathBuf;
use std::time::Duration;

use ow_core::config::AppConfig;
use ow_core::security::SecretString;
use ow_core::transport::TransportConfig;
use ow_core::wallet::{
    CommsConfig, Network, DEFAULT_DISCOVERY_TIMEOUT, DEFAULT_SAF_MESSAGE_DURATION,
};

/// Derives the wallet backend's connect configuration for a network.
#[derive(Debug, Clone)]
pub struct CommsConfigFactory {
    wallet_root: PathBuf,
    transport: TransportConfig,
    discovery_timeout: Duration,
    saf_message_duration: Duration,
}

impl CommsConfigFactory {
    pub fn new(wallet_root: PathBuf, transport: TransportConfig) -> Self {
        Self {
            wallet_root,
            transport,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            saf_message_duration: DEFAULT_SAF_MESSAGE_DURATION,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            discovery_timeout: config.discovery_timeout,
            saf_message_duration: config.saf_message_duration,
            ..Self::new(config.wallet_root(), config.transport_config())
        }
    }

    pub fn build(&self, network: Network, passphrase: Option<SecretString>) -> CommsConfig {
        CommsConfig {
            network,
            database_dir: self.wallet_root.join(network.as_str()),
            database_name: format!("{}_wallet", network.as_str()),
            discovery_timeout: self.discovery_timeout,
            saf_message_duration: self.saf_message_duration,
            public_address: network.public_address(),
            socks_endpoint: self.transport.socks_endpoint(),
            control_endpoint: self.transport.control_endpoint(),
            control_cookie_path: self.transport.cookie_path(),
            passphrase,
        }
    }
}
