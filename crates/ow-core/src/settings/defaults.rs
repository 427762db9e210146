use super::model::*;
use crate::wallet::Network;

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            use_custom_bridges: false,
            bridge_lines: String::new(),
        }
    }
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            selected_network: Network::Mainnet,
            auto_reconnect: true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            transport: TransportSettings::default(),
            wallet: WalletSettings::default(),
        }
    }
}
