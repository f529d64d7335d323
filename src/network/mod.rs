pub mod manager;
pub mod profile;

pub use self::manager::{current_network, Error, NetworkManager, SetupError};
pub use self::profile::Network;

use crate::config::NodeArgs;
use crate::external::{self, HttpFetcher};
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub enum NetworkCommand {
    /// download the genesis file of a network and configure the node for it
    Setup {
        #[structopt(flatten)]
        node: NodeArgs,
        /// mainnet, testnet or betanet
        #[structopt(long, default_value = "mainnet")]
        network: Network,
        /// the node is a relay
        #[structopt(long)]
        relay: bool,
    },
    /// print the network the node is configured for
    Current {
        #[structopt(flatten)]
        node: NodeArgs,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Network(#[from] Error),
    #[error(transparent)]
    External(#[from] external::Error),
}

impl NetworkCommand {
    pub fn exec(self) -> Result<(), CommandError> {
        match self {
            NetworkCommand::Setup {
                node,
                network,
                relay,
            } => {
                let fetcher = HttpFetcher::new()?;
                NetworkManager::new(node.data_dir, relay, &fetcher).setup_network(network)?;
                println!("{}", network);
            }
            NetworkCommand::Current { node } => match current_network(&node.data_dir) {
                Some(network) => println!("{}", network),
                None => println!("unknown"),
            },
        }
        Ok(())
    }
}
