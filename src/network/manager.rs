use super::profile::{Network, GENESIS_FILE_NAME};
use crate::config::{self, node::RELAY_NET_ADDRESS, ConfigStore, NodeConfigUpdate};
use crate::external::{self, Fetch};
use crate::utils::{self, io::write_atomic};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const GOSSIP_FANOUT: u32 = 4;

#[derive(Debug, Error)]
pub enum Error {
    #[error("network setup failed")]
    Setup(#[source] SetupError),
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot create directory `{}`", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot download the {network} genesis file")]
    Download {
        network: Network,
        #[source]
        source: external::Error,
    },
    #[error("cannot store the downloaded genesis file")]
    Store(#[source] utils::io::Error),
    #[error("cannot install the genesis file into `{}`", .path.display())]
    Install {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot update the node configuration")]
    Config(#[source] config::Error),
}

impl From<SetupError> for Error {
    fn from(error: SetupError) -> Self {
        Error::Setup(error)
    }
}

#[derive(Deserialize)]
struct GenesisHeader {
    #[serde(default)]
    network: String,
}

/// The network a data directory is set up for, read from its `genesis.json`.
///
/// Returns `None` when the file is missing, unreadable or declares a network
/// that is not one of the known ones.
pub fn current_network<P: AsRef<Path>>(data_dir: P) -> Option<Network> {
    let path = data_dir.as_ref().join(GENESIS_FILE_NAME);
    if !path.is_file() {
        return None;
    }
    let header: GenesisHeader = match fs::read(&path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_slice(&content).map_err(|e| e.to_string()))
    {
        Ok(header) => header,
        Err(reason) => {
            tracing::error!(path = %path.display(), %reason, "cannot read genesis file");
            return None;
        }
    };
    Network::from_genesis_id(&header.network)
}

/// Installs a network's genesis file into a data directory and points the
/// node configuration at that network.
pub struct NetworkManager<'a> {
    data_dir: PathBuf,
    is_relay: bool,
    fetcher: &'a dyn Fetch,
}

impl<'a> NetworkManager<'a> {
    pub fn new<P: Into<PathBuf>>(data_dir: P, is_relay: bool, fetcher: &'a dyn Fetch) -> Self {
        Self {
            data_dir: data_dir.into(),
            is_relay,
            fetcher,
        }
    }

    pub fn setup_network(&self, network: Network) -> Result<(), Error> {
        tracing::info!(%network, "setting up network");
        let result = self
            .install_genesis(network)
            .and_then(|()| self.configure_network(network));
        if let Err(error) = &result {
            tracing::error!(%network, reason = %error, "network setup failed");
        }
        result.map_err(Error::Setup)?;
        tracing::info!(%network, "node configured for network");
        Ok(())
    }

    pub fn current_network(&self) -> Option<Network> {
        current_network(&self.data_dir)
    }

    fn install_genesis(&self, network: Network) -> Result<(), SetupError> {
        let cached = network.cached_genesis_path(&self.data_dir);
        if let Some(dir) = cached.parent() {
            fs::create_dir_all(dir).map_err(|source| SetupError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        if cached.is_file() {
            tracing::debug!(path = %cached.display(), "genesis file already downloaded");
        } else {
            tracing::info!(%network, "downloading genesis file");
            let content = self
                .fetcher
                .get(&network.genesis_url())
                .map_err(|source| SetupError::Download { network, source })?;
            write_atomic(&cached, &content).map_err(SetupError::Store)?;
        }

        let active = self.data_dir.join(GENESIS_FILE_NAME);
        fs::copy(&cached, &active).map_err(|source| SetupError::Install {
            path: active.clone(),
            source,
        })?;
        Ok(())
    }

    fn configure_network(&self, network: Network) -> Result<(), SetupError> {
        let mut store = ConfigStore::new(&self.data_dir, self.is_relay);
        config::load_or_warn(&mut store);
        store.update(NodeConfigUpdate {
            gossip_fanout: Some(GOSSIP_FANOUT),
            dns_bootstrap_id: Some(network.dns_bootstrap_id()),
            net_address: Some(if self.is_relay {
                RELAY_NET_ADDRESS.to_owned()
            } else {
                String::new()
            }),
            ..Default::default()
        });
        store.save().map_err(SetupError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use predicates::prelude::*;
    use std::cell::RefCell;

    struct CountingFetch {
        urls: RefCell<Vec<String>>,
    }

    impl CountingFetch {
        fn new() -> Self {
            Self {
                urls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Fetch for CountingFetch {
        fn get(&self, url: &str) -> Result<Vec<u8>, external::Error> {
            self.urls.borrow_mut().push(url.to_owned());
            Ok(br#"{ "network": "testnet-v1.0", "alloc": [] }"#.to_vec())
        }
    }

    struct FailingFetch;

    impl Fetch for FailingFetch {
        fn get(&self, _url: &str) -> Result<Vec<u8>, external::Error> {
            Err(external::Error::Requirement("offline".to_owned()))
        }
    }

    #[test]
    fn genesis_is_downloaded_once() {
        let temp_dir = TempDir::new().unwrap();
        let fetch = CountingFetch::new();
        let manager = NetworkManager::new(temp_dir.path(), false, &fetch);

        manager.setup_network(Network::Testnet).unwrap();
        manager.setup_network(Network::Testnet).unwrap();

        assert_eq!(fetch.urls.borrow().len(), 1);
        temp_dir
            .child("genesis/testnet/genesis.json")
            .assert(predicate::path::is_file());
        temp_dir
            .child("config.json")
            .assert(predicate::str::contains("testnet.algorand.network"));
        assert_eq!(manager.current_network(), Some(Network::Testnet));
    }

    #[test]
    fn interrupted_store_is_downloaded_again() {
        let temp_dir = TempDir::new().unwrap();
        let genesis_dir = temp_dir.child("genesis/testnet");
        genesis_dir.child(".genesis.json.tmp").create_dir_all().unwrap();
        let fetch = CountingFetch::new();
        let manager = NetworkManager::new(temp_dir.path(), false, &fetch);

        let Error::Setup(cause) = manager.setup_network(Network::Testnet).unwrap_err();
        assert!(matches!(cause, SetupError::Store(_)));
        genesis_dir
            .child("genesis.json")
            .assert(predicate::path::missing());

        fs::remove_dir(genesis_dir.child(".genesis.json.tmp").path()).unwrap();
        manager.setup_network(Network::Testnet).unwrap();

        assert_eq!(fetch.urls.borrow().len(), 2);
        genesis_dir
            .child("genesis.json")
            .assert(predicate::str::contains("testnet-v1.0"));
        genesis_dir
            .child(".genesis.json.tmp")
            .assert(predicate::path::missing());
    }

    #[test]
    fn existing_settings_survive() {
        let temp_dir = TempDir::new().unwrap();
        temp_dir
            .child("config.json")
            .write_str(r#"{ "Archival": true, "GossipFanout": 9 }"#)
            .unwrap();
        let fetch = CountingFetch::new();

        NetworkManager::new(temp_dir.path(), true, &fetch)
            .setup_network(Network::Betanet)
            .unwrap();

        let mut store = ConfigStore::new(temp_dir.path(), false);
        store.load_existing().unwrap();
        assert!(store.config().archival);
        assert_eq!(store.config().gossip_fanout, GOSSIP_FANOUT);
        assert_eq!(store.config().net_address, RELAY_NET_ADDRESS);
        assert_eq!(store.config().dns_bootstrap_id, "betanet.algodev.network");
    }

    #[test]
    fn download_failure_names_the_cause() {
        let temp_dir = TempDir::new().unwrap();
        let error = NetworkManager::new(temp_dir.path(), false, &FailingFetch)
            .setup_network(Network::Mainnet)
            .unwrap_err();

        assert_eq!(error.to_string(), "network setup failed");
        let Error::Setup(cause) = error;
        assert!(matches!(
            cause,
            SetupError::Download {
                network: Network::Mainnet,
                ..
            }
        ));
        temp_dir
            .child("config.json")
            .assert(predicate::path::missing());
    }

    #[test]
    fn unknown_or_missing_genesis() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(current_network(temp_dir.path()), None);

        temp_dir.child("genesis.json").write_str("garbage").unwrap();
        assert_eq!(current_network(temp_dir.path()), None);

        temp_dir
            .child("genesis.json")
            .write_str(r#"{ "network": "devnet-v1" }"#)
            .unwrap();
        assert_eq!(current_network(temp_dir.path()), None);

        temp_dir
            .child("genesis.json")
            .write_str(r#"{ "network": "MainNet-v1.0" }"#)
            .unwrap();
        assert_eq!(current_network(temp_dir.path()), Some(Network::Mainnet));
    }
}
