use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Wallet network the backend connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    #[default]
    Mainnet,
    Nextnet,
    Stagenet,
    Esmeralda,
    Localnet,
}

impl Network {
    pub const ALL: [Network; 5] = [
        Network::Mainnet,
        Network::Nextnet,
        Network::Stagenet,
        Network::Esmeralda,
        Network::Localnet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Nextnet => "nextnet",
            Network::Stagenet => "stagenet",
            Network::Esmeralda => "esmeralda",
            Network::Localnet => "localnet",
        }
    }

    fn public_port(self) -> u16 {
        match self {
            Network::Mainnet => 18141,
            Network::Nextnet => 18142,
            Network::Stagenet => 18143,
            Network::Esmeralda => 18144,
            Network::Localnet => 18189,
        }
    }

    /// Address the wallet advertises to peers on this network.
    pub fn public_address(self) -> String {
        format!("/ip4/127.0.0.1/tcp/{}", self.public_port())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network: {0}")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Network::ALL
            .into_iter()
            .find(|n| n.as_str() == wanted)
            .ok_or_else(|| UnknownNetwork(s.to_string()))
    }
}
