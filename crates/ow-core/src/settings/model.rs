use serde::{Deserialize, Serialize};

use crate::transport::BridgeConfiguration;
use crate::wallet::Network;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    pub use_custom_bridges: bool,

    /// Newline-delimited bridge lines as entered by the user.
    #[serde(default)]
    pub bridge_lines: String,
}

impl TransportSettings {
    pub fn bridges(&self) -> BridgeConfiguration {
        BridgeConfiguration::from_persisted(self.use_custom_bridges, &self.bridge_lines)
    }

    pub fn set_bridges(&mut self, bridges: &BridgeConfiguration) {
        self.use_custom_bridges = bridges.is_custom();
        self.bridge_lines = bridges.to_persisted_lines();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSettings {
    pub selected_network: Network,
    pub auto_reconnect: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub transport: TransportSettings,

    #[serde(default)]
    pub wallet: WalletSettings,
}

fn current_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}
