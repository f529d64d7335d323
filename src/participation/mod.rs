pub mod accounts;
pub mod manager;

pub use self::accounts::AccountManager;
pub use self::manager::{ParticipationManager, ParticipationStatus, ValidityRange};

use crate::config::NodeArgs;
use crate::external::{self, goal::ParseError, Goal};
use crate::utils::{output_format, OutputFormat};
use std::path::PathBuf;
use structopt::StructOpt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validity range of {length} rounds is longer than {} rounds, confirmation required", manager::SOFT_ROUND_CEILING)]
    RangeNeedsConfirmation { length: u64 },
    #[error("last round {last} must come after first round {first}")]
    InvalidRange { first: u64, last: u64 },
    #[error("participation key generation failed for {address}")]
    Generate {
        address: String,
        #[source]
        source: external::Error,
    },
    #[error("cannot create the {status} registration for {address}")]
    Registration {
        address: String,
        status: &'static str,
        #[source]
        source: external::Error,
    },
    #[error("cannot create a new account")]
    NewAccount(#[source] external::Error),
    #[error("cannot list accounts")]
    ListAccounts(#[source] external::Error),
    #[error("unexpected output from the node CLI")]
    UnexpectedOutput(#[source] ParseError),
    #[error("cannot sign `{}`", .path.display())]
    Sign {
        path: PathBuf,
        #[source]
        source: external::Error,
    },
    #[error(transparent)]
    Output(#[from] output_format::Error),
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub enum PartKey {
    /// generate a participation key for an account
    Generate {
        #[structopt(flatten)]
        node: NodeArgs,
        /// account address
        #[structopt(long)]
        address: String,
        /// first round the key is valid for
        #[structopt(long)]
        first_round: u64,
        /// last round the key is valid for
        #[structopt(long)]
        last_round: u64,
        #[structopt(long)]
        key_dilution: Option<u64>,
        /// accept validity ranges longer than 3000000 rounds
        #[structopt(long)]
        force: bool,
    },
    /// list the participation keys installed on the node
    List {
        #[structopt(flatten)]
        node: NodeArgs,
        #[structopt(flatten)]
        output_format: OutputFormat,
    },
    /// create the transaction registering an account online
    RegisterOnline {
        #[structopt(flatten)]
        node: NodeArgs,
        #[structopt(long)]
        address: String,
    },
    /// create the transaction registering an account offline
    RegisterOffline {
        #[structopt(flatten)]
        node: NodeArgs,
        #[structopt(long)]
        address: String,
    },
    /// print whether an account participates in consensus
    Status {
        #[structopt(flatten)]
        node: NodeArgs,
        #[structopt(long)]
        address: String,
    },
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub enum Account {
    /// create an account in the default wallet
    New {
        #[structopt(flatten)]
        node: NodeArgs,
    },
    /// list the accounts of the default wallet
    List {
        #[structopt(flatten)]
        node: NodeArgs,
        #[structopt(flatten)]
        output_format: OutputFormat,
    },
    /// sign a transaction file
    Sign {
        #[structopt(flatten)]
        node: NodeArgs,
        /// unsigned transaction
        #[structopt(long, parse(from_os_str))]
        input: PathBuf,
        /// where to write the signed transaction
        #[structopt(long, parse(from_os_str))]
        output: PathBuf,
    },
}

impl PartKey {
    pub fn exec(self) -> Result<(), Error> {
        match self {
            PartKey::Generate {
                node,
                address,
                first_round,
                last_round,
                key_dilution,
                force,
            } => {
                if last_round <= first_round {
                    return Err(Error::InvalidRange {
                        first: first_round,
                        last: last_round,
                    });
                }
                let mut range =
                    ValidityRange::new(first_round, last_round).with_dilution(key_dilution);
                if force {
                    range = range.confirmed();
                }
                let goal = Goal::new(&node.data_dir);
                ParticipationManager::new(&node.data_dir, &goal).generate(&address, range)
            }
            PartKey::List {
                node,
                output_format,
            } => {
                let goal = Goal::new(&node.data_dir);
                let keys = ParticipationManager::new(&node.data_dir, &goal).list();
                println!("{}", output_format.format(&keys)?);
                Ok(())
            }
            PartKey::RegisterOnline { node, address } => {
                let goal = Goal::new(&node.data_dir);
                let path = ParticipationManager::new(&node.data_dir, &goal).register_online(&address)?;
                println!("{}", path.display());
                Ok(())
            }
            PartKey::RegisterOffline { node, address } => {
                let goal = Goal::new(&node.data_dir);
                let path =
                    ParticipationManager::new(&node.data_dir, &goal).register_offline(&address)?;
                println!("{}", path.display());
                Ok(())
            }
            PartKey::Status { node, address } => {
                let goal = Goal::new(&node.data_dir);
                let status = ParticipationManager::new(&node.data_dir, &goal)
                    .check_participation_status(&address);
                println!("{}", status);
                Ok(())
            }
        }
    }
}

impl Account {
    pub fn exec(self) -> Result<(), Error> {
        match self {
            Account::New { node } => {
                let goal = Goal::new(&node.data_dir);
                println!("{}", AccountManager::new(&goal).new_account()?);
            }
            Account::List {
                node,
                output_format,
            } => {
                let goal = Goal::new(&node.data_dir);
                let accounts = AccountManager::new(&goal).list_accounts()?;
                println!("{}", output_format.format(&accounts)?);
            }
            Account::Sign {
                node,
                input,
                output,
            } => {
                let goal = Goal::new(&node.data_dir);
                let signed = AccountManager::new(&goal).sign_transaction(&input, &output)?;
                println!("{}", signed.display());
            }
        }
        Ok(())
    }
}
