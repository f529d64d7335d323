pub mod dependencies;
pub mod orchestrator;
pub mod service;
pub mod settings;
pub mod telemetry;
pub mod usage;

pub use self::orchestrator::{
    Collaborators, InstallEvent, InstallHandle, InstallStep, Installer, StepError,
};
pub use self::settings::{InstallOptions, InstallSettings};

use crate::external::{self, HostChecks, RequirementsCheck, SystemRequirements};
use crate::network::Network;
use crate::utils::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use structopt::StructOpt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read the saved installer settings")]
    Settings(#[source] io::Error),
    #[error(transparent)]
    External(#[from] external::Error),
    #[error("Installation failed. Check logs for details.")]
    Failed,
}

/// Install and start an Algorand node
#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Install {
    /// where the installer keeps its settings and logs [default: /opt/algorand]
    #[structopt(long, parse(from_os_str))]
    install_dir: Option<PathBuf>,
    /// node data directory [default: /var/lib/algorand]
    #[structopt(long, short = "d", parse(from_os_str))]
    data_dir: Option<PathBuf>,
    /// directory of the node binaries [default: /usr/bin]
    #[structopt(long, parse(from_os_str))]
    bin_dir: Option<PathBuf>,
    /// mainnet, testnet or betanet [default: mainnet]
    #[structopt(long)]
    network: Option<Network>,
    /// set the node up as a relay, implies --archival
    #[structopt(long)]
    relay: bool,
    /// undo a saved --relay
    #[structopt(long, conflicts_with = "relay")]
    no_relay: bool,
    /// keep the full ledger history
    #[structopt(long)]
    archival: bool,
    /// undo a saved --archival, ignored for relays
    #[structopt(long, conflicts_with = "archival")]
    no_archival: bool,
    /// turn remote logging on
    #[structopt(long)]
    telemetry: bool,
    /// undo a saved --telemetry
    #[structopt(long, conflicts_with = "telemetry")]
    no_telemetry: bool,
    /// name reported by telemetry, defaults to the host name
    #[structopt(long)]
    telemetry_name: Option<String>,
    /// ignore the settings saved by a previous run
    #[structopt(long)]
    fresh: bool,
    /// wait between restarting the node and checking it runs
    #[structopt(long, default_value = "5s", parse(try_from_str = humantime::parse_duration))]
    restart_delay: Duration,
}

impl Install {
    pub fn install_dir(&self) -> PathBuf {
        self.install_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(settings::DEFAULT_INSTALL_DIR))
    }

    /// Saved settings, unless `--fresh`, with the command line on top.
    ///
    /// A saved switch stays on until its `--no-*` flag turns it off.
    pub fn resolve_settings(&self) -> Result<InstallSettings, Error> {
        let install_dir = self.install_dir();
        let saved = if self.fresh {
            None
        } else {
            InstallSettings::load(&install_dir).map_err(Error::Settings)?
        };
        if saved.is_some() {
            tracing::info!(install_dir = %install_dir.display(), "resuming saved installer settings");
        }
        let mut settings = saved.unwrap_or_default();
        settings.install_dir = install_dir;
        if let Some(data_dir) = &self.data_dir {
            settings.data_dir = data_dir.clone();
        }
        if let Some(bin_dir) = &self.bin_dir {
            settings.bin_dir = bin_dir.clone();
        }
        if let Some(network) = self.network {
            settings.network = network;
        }
        settings.relay = switch(settings.relay, self.relay, self.no_relay);
        settings.archival = switch(settings.archival, self.archival, self.no_archival);
        settings.telemetry = switch(settings.telemetry, self.telemetry, self.no_telemetry);
        Ok(settings.normalized())
    }

    pub fn exec(self) -> Result<(), Error> {
        let settings = self.resolve_settings()?;
        let mut options = InstallOptions::from_env();
        options.telemetry_name = self.telemetry_name.clone();
        options.restart_delay = self.restart_delay;

        let collaborators = Collaborators::system(&settings, &options)?;
        let installer = Installer::new(settings, options, collaborators);
        let summary = usage::next_steps(installer.settings(), installer.options());

        let handle = installer.spawn();
        let total = InstallStep::ALL.len();
        for event in handle.events.iter() {
            match event {
                InstallEvent::StepStarted(step) => {
                    let index = InstallStep::ALL
                        .iter()
                        .position(|s| *s == step)
                        .map_or(0, |i| i + 1);
                    println!("[{}/{}] {}", index, total, step);
                }
                InstallEvent::Warning(message) => println!("warning: {}", message),
                InstallEvent::StepFinished(_) | InstallEvent::Done => {}
                InstallEvent::Failed { step, message } => {
                    println!("{} failed: {}", step, message)
                }
            }
        }

        if handle.wait() {
            print!("\n{}", summary);
            Ok(())
        } else {
            Err(Error::Failed)
        }
    }
}

fn switch(saved: bool, on: bool, off: bool) -> bool {
    (saved || on) && !off
}

/// Check whether this host can run a node
#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Check {
    /// directory the installer would write to
    #[structopt(long, parse(from_os_str), default_value = settings::DEFAULT_INSTALL_DIR)]
    install_dir: PathBuf,
    /// also check the installer's permissions (needs sudo)
    #[structopt(long)]
    permissions: bool,
}

impl Check {
    pub fn exec(self) -> Result<(), Error> {
        let disk_path = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.install_dir.clone());
        let checks = HostChecks::new(SystemRequirements::default(), disk_path);
        let facts = checks.gather();
        println!("{:#?}", facts);
        checks.check_system()?;
        println!("system requirements met");
        if self.permissions {
            for warning in checks.check_permissions(Path::new(&self.install_dir))? {
                println!("warning: {}", warning);
            }
            println!("permissions ok");
        }
        Ok(())
    }
}
