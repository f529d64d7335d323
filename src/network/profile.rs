use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const GENESIS_BASE_URL: &str =
    "https://raw.githubusercontent.com/algorand/go-algorand/master/installer/genesis";
pub const GENESIS_FILE_NAME: &str = "genesis.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Betanet,
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Mainnet, Network::Testnet, Network::Betanet];

    pub fn name(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Betanet => "betanet",
        }
    }

    /// DNS domain the node discovers its peers from.
    pub fn dns_bootstrap_id(self) -> String {
        match self {
            Network::Betanet => "betanet.algodev.network".to_owned(),
            other => format!("{}.algorand.network", other.name()),
        }
    }

    pub fn genesis_url(self) -> String {
        format!("{}/{}/{}", GENESIS_BASE_URL, self.name(), GENESIS_FILE_NAME)
    }

    /// Downloaded copy, `<data_dir>/genesis/<network>/genesis.json`.
    pub fn cached_genesis_path<P: AsRef<Path>>(self, data_dir: P) -> PathBuf {
        data_dir
            .as_ref()
            .join("genesis")
            .join(self.name())
            .join(GENESIS_FILE_NAME)
    }

    /// Classifies the `network` field of a genesis document, e.g. `testnet-v1.0`.
    pub fn from_genesis_id(id: &str) -> Option<Network> {
        let id = id.to_lowercase();
        Network::ALL
            .iter()
            .copied()
            .find(|network| id.contains(network.name()))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &*s.trim().to_lowercase() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "betanet" => Ok(Network::Betanet),
            other => Err(format!(
                "unknown network '{}', expected mainnet, testnet or betanet",
                other
            )),
        }
    }
}
