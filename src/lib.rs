pub mod auto_completion;
pub mod config;
pub mod external;
pub mod installer;
pub mod log;
pub mod network;
pub mod node;
pub mod participation;
pub mod utils;

use std::error::Error;
use std::time::SystemTime;
use structopt::StructOpt;

/// Algorand node installer and management toolkit
#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct AlgoInstall {
    /// display full version details (software version, source version, targets and compiler used)
    #[structopt(long = "full-version")]
    full_version: bool,

    /// display the sources version, allowing to check the source's hash used to compile this executable.
    /// this option is useful for scripting retrieving the logs of the version of this application.
    #[structopt(long = "source-version")]
    source_version: bool,

    #[structopt(flatten)]
    log: log::CliSettings,

    #[structopt(subcommand)]
    command: Option<AlgoInstallCommand>,
}

#[allow(clippy::large_enum_variant)]
/// Algorand node installer and management toolkit
#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub enum AlgoInstallCommand {
    /// Install, configure and start a node
    Install(installer::Install),
    /// Check whether this host can run a node
    Check(installer::Check),
    /// Inspect and change the node configuration
    Config(config::Config),
    /// Network genesis and bootstrap settings
    Network(network::NetworkCommand),
    /// Participation key management
    Partkey(participation::PartKey),
    /// Wallet account helpers
    Account(participation::Account),
    /// Node service control and logs
    Node(node::Node),
    /// Auto completion
    AutoCompletion(auto_completion::AutoCompletion),
}

impl AlgoInstall {
    pub fn exec(self) -> Result<(), Box<dyn Error>> {
        use std::io::Write as _;
        if self.full_version {
            return Ok(writeln!(std::io::stdout(), "{}", env!("FULL_VERSION"))?);
        }
        if self.source_version {
            return Ok(writeln!(std::io::stdout(), "{}", env!("SOURCE_VERSION"))?);
        }
        let cmd = match self.command {
            Some(cmd) => cmd,
            None => {
                writeln!(std::io::stderr(), "No command, try `--help'")?;
                std::process::exit(1);
            }
        };

        let mut log_settings = log::LogSettings::new(&self.log);
        if let AlgoInstallCommand::Install(install) = &cmd {
            log_settings = log_settings.with_install_log(log::install_log_path(
                install.install_dir(),
                SystemTime::now(),
            ));
        }
        let (_guards, log_info) = log_settings.init_log()?;
        if let Some(msgs) = log_info {
            for msg in &msgs {
                tracing::info!("{}", msg);
            }
        }
        tracing::debug!(version = env!("SIMPLE_VERSION"), "starting");

        cmd.exec()
    }
}

impl AlgoInstallCommand {
    pub fn exec(self) -> Result<(), Box<dyn Error>> {
        use self::AlgoInstallCommand::*;
        match self {
            Install(install) => install.exec()?,
            Check(check) => check.exec()?,
            Config(config) => config.exec()?,
            Network(network) => network.exec()?,
            Partkey(partkey) => partkey.exec()?,
            Account(account) => account.exec()?,
            Node(node) => node.exec()?,
            AutoCompletion(auto_completion) => auto_completion.exec::<AlgoInstall>()?,
        };
        Ok(())
    }
}
