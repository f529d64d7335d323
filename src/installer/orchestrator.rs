use super::dependencies::install_dependencies;
use super::service::{export_data_dir, render_unit};
use super::settings::{InstallOptions, InstallSettings};
use super::telemetry::{TelemetryError, TelemetryVerification};
use crate::config::{self, kmd, ConfigStore, NodeConfigUpdate};
use crate::external::{
    self, Apt, AptRepository, Diagcfg, Diagnostics, Fetch, HostChecks, HttpFetcher,
    PackageManager, RequirementsCheck, ServiceManager, Systemctl, SystemRequirements,
};
use crate::external::process::hand_over;
use crate::network::{self, NetworkManager};
use crate::utils::io;
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use thiserror::Error;

const RELEASE_KEY_URL: &str = "https://releases.algorand.com/key.pub";
const RELEASE_KEY_PATH: &str = "/etc/apt/trusted.gpg.d/algorand.asc";
const RELEASE_SOURCE: &str = "deb [arch=amd64] https://releases.algorand.com/deb/ stable main";
const NODE_PACKAGE: &str = "algorand-devtools";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    CreateDirs,
    RunChecks,
    InstallDependencies,
    ConfigureNode,
    InstallBinaries,
    SetupNetwork,
    ConfigureServices,
    StartNode,
    ConfigureTelemetry,
}

impl InstallStep {
    pub const ALL: [InstallStep; 9] = [
        InstallStep::CreateDirs,
        InstallStep::RunChecks,
        InstallStep::InstallDependencies,
        InstallStep::ConfigureNode,
        InstallStep::InstallBinaries,
        InstallStep::SetupNetwork,
        InstallStep::ConfigureServices,
        InstallStep::StartNode,
        InstallStep::ConfigureTelemetry,
    ];
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstallStep::CreateDirs => "create directories",
            InstallStep::RunChecks => "check system",
            InstallStep::InstallDependencies => "install dependencies",
            InstallStep::ConfigureNode => "configure node",
            InstallStep::InstallBinaries => "install node binaries",
            InstallStep::SetupNetwork => "set up network",
            InstallStep::ConfigureServices => "configure service",
            InstallStep::StartNode => "start node",
            InstallStep::ConfigureTelemetry => "configure telemetry",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("cannot create directory `{}`", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot save the installer settings")]
    Settings(#[source] io::Error),
    #[error("cannot update `{}`", .path.display())]
    Profile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot render the service unit: {0}")]
    Template(String),
    #[error(transparent)]
    External(#[from] external::Error),
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Network(#[from] network::Error),
    #[error("telemetry configuration failed")]
    Telemetry(#[source] TelemetryError),
}

#[derive(Debug, Error)]
#[error("installation step `{step}` failed")]
pub struct Error {
    pub step: InstallStep,
    #[source]
    pub source: StepError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    StepStarted(InstallStep),
    StepFinished(InstallStep),
    Warning(String),
    Done,
    Failed { step: InstallStep, message: String },
}

/// The external capabilities an installation relies on.
pub struct Collaborators {
    pub packages: Box<dyn PackageManager + Send>,
    pub services: Box<dyn ServiceManager + Send>,
    pub diagnostics: Box<dyn Diagnostics + Send>,
    pub fetcher: Box<dyn Fetch + Send>,
    pub checks: Box<dyn RequirementsCheck + Send>,
}

impl Collaborators {
    /// `apt`, `systemctl`, `diagcfg`, HTTPS and the host checks.
    pub fn system(settings: &InstallSettings, options: &InstallOptions) -> Result<Self, external::Error> {
        let disk_path = options
            .home_dir
            .clone()
            .unwrap_or_else(|| settings.install_dir.clone());
        Ok(Collaborators {
            packages: Box::new(Apt::default()),
            services: Box::new(Systemctl::default()),
            diagnostics: Box::new(Diagcfg::new(
                settings.data_dir.clone(),
                Some(options.service_user.clone()),
            )),
            fetcher: Box::new(HttpFetcher::new()?),
            checks: Box::new(HostChecks::new(SystemRequirements::default(), disk_path)),
        })
    }
}

/// Runs the installation steps in order.
///
/// The first failing step ends the run. Nothing is undone, the host is left
/// as the last successful step made it.
pub struct Installer {
    settings: InstallSettings,
    options: InstallOptions,
    collaborators: Collaborators,
    events: Option<Sender<InstallEvent>>,
}

pub struct InstallHandle {
    pub events: Receiver<InstallEvent>,
    handle: JoinHandle<bool>,
}

impl InstallHandle {
    /// Waits for the installation, `false` when it failed.
    pub fn wait(self) -> bool {
        self.handle.join().unwrap_or(false)
    }
}

impl Installer {
    pub fn new(settings: InstallSettings, options: InstallOptions, collaborators: Collaborators) -> Self {
        Installer {
            settings: settings.normalized(),
            options,
            collaborators,
            events: None,
        }
    }

    pub fn settings(&self) -> &InstallSettings {
        &self.settings
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    pub fn with_events(mut self, events: Sender<InstallEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Runs the installation on a worker thread, reporting progress through
    /// the returned handle.
    pub fn spawn(self) -> InstallHandle {
        let (sender, events) = mpsc::channel();
        let installer = self.with_events(sender);
        let handle = std::thread::spawn(move || installer.run_installation());
        InstallHandle { events, handle }
    }

    /// Runs every step, logging the failure if any.
    pub fn run_installation(&self) -> bool {
        match self.run() {
            Ok(()) => {
                tracing::info!("installation completed");
                self.emit(InstallEvent::Done);
                true
            }
            Err(error) => {
                let mut message = error.to_string();
                let mut source = std::error::Error::source(&error);
                while let Some(cause) = source {
                    message.push_str(": ");
                    message.push_str(&cause.to_string());
                    source = cause.source();
                }
                tracing::error!(step = %error.step, reason = %message, "installation failed");
                self.emit(InstallEvent::Failed {
                    step: error.step,
                    message,
                });
                false
            }
        }
    }

    pub fn run(&self) -> Result<(), Error> {
        for step in InstallStep::ALL.iter().copied() {
            tracing::info!(%step, "starting");
            self.emit(InstallEvent::StepStarted(step));
            self.run_step(step)
                .map_err(|source| Error { step, source })?;
            self.emit(InstallEvent::StepFinished(step));
        }
        Ok(())
    }

    fn run_step(&self, step: InstallStep) -> Result<(), StepError> {
        match step {
            InstallStep::CreateDirs => self.create_dirs(),
            InstallStep::RunChecks => self.run_checks(),
            InstallStep::InstallDependencies => {
                let warnings = install_dependencies(&*self.collaborators.packages)?;
                self.warn_all(warnings);
                Ok(())
            }
            InstallStep::ConfigureNode => self.configure_node(),
            InstallStep::InstallBinaries => self.install_binaries(),
            InstallStep::SetupNetwork => {
                NetworkManager::new(
                    &self.settings.data_dir,
                    self.settings.relay,
                    &*self.collaborators.fetcher,
                )
                .setup_network(self.settings.network)?;
                Ok(())
            }
            InstallStep::ConfigureServices => self.configure_services(),
            InstallStep::StartNode => {
                self.collaborators
                    .services
                    .start(&self.options.service_name)?;
                Ok(())
            }
            InstallStep::ConfigureTelemetry => self.configure_telemetry(),
        }
    }

    fn create_dirs(&self) -> Result<(), StepError> {
        for dir in &[
            &self.settings.install_dir,
            &self.settings.data_dir,
            &self.settings.bin_dir,
        ] {
            std::fs::create_dir_all(dir).map_err(|source| StepError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        self.settings.save().map_err(StepError::Settings)
    }

    fn run_checks(&self) -> Result<(), StepError> {
        let checks = &self.collaborators.checks;
        checks.check_system()?;
        let warnings = checks.check_permissions(&self.settings.install_dir)?;
        self.warn_all(warnings);
        Ok(())
    }

    fn config_store(&self) -> ConfigStore {
        ConfigStore::new(&self.settings.data_dir, self.settings.relay).with_global_telemetry_dir(
            self.options
                .home_dir
                .as_ref()
                .map(|home| home.join(".algorand")),
        )
    }

    fn configure_node(&self) -> Result<(), StepError> {
        let mut store = self.config_store();
        config::load_or_warn(&mut store);
        store.update(NodeConfigUpdate {
            archival: Some(self.settings.archival),
            enable_telemetry: Some(self.settings.telemetry),
            ..Default::default()
        });
        store.save()?;
        store.configure_kmd(kmd::DEFAULT_KMD_PORT, kmd::DEFAULT_SESSION_MINUTES)?;
        Ok(())
    }

    fn install_binaries(&self) -> Result<(), StepError> {
        let packages = &self.collaborators.packages;
        let key = self.collaborators.fetcher.get(RELEASE_KEY_URL)?;
        packages.add_repository(&AptRepository {
            key,
            key_path: PathBuf::from(RELEASE_KEY_PATH),
            source: RELEASE_SOURCE.to_owned(),
        })?;
        packages.update_index()?;
        packages.install(&[NODE_PACKAGE])?;

        match &self.options.home_dir {
            Some(home) => {
                let profile = home.join(".bashrc");
                let changed = export_data_dir(&profile, &self.settings.data_dir).map_err(
                    |source| StepError::Profile {
                        path: profile.clone(),
                        source,
                    },
                )?;
                if changed {
                    if let Some(owner) = &self.options.home_owner {
                        hand_over(owner, &profile)?;
                    }
                    tracing::info!(profile = %profile.display(), "ALGORAND_DATA exported");
                }
            }
            None => self.warn("no home directory, ALGORAND_DATA not exported".to_owned()),
        }
        Ok(())
    }

    fn configure_services(&self) -> Result<(), StepError> {
        let unit = render_unit(
            &self.settings.data_dir,
            &self.settings.bin_dir,
            &self.options.service_user,
            &self.options.service_group,
        )
        .map_err(StepError::Template)?;
        let services = &self.collaborators.services;
        services.install_unit(&self.options.service_name, &unit)?;
        services.enable(&self.options.service_name)?;
        Ok(())
    }

    fn configure_telemetry(&self) -> Result<(), StepError> {
        let store = self.config_store();
        let mut verification = TelemetryVerification::new(
            &store,
            &*self.collaborators.diagnostics,
            &*self.collaborators.services,
            &self.options.service_name,
        );
        verification
            .restart_delay(self.options.restart_delay)
            .global_owner(self.options.home_owner.clone());
        verification
            .apply(self.settings.telemetry, self.options.telemetry_name.as_deref())
            .map_err(StepError::Telemetry)?;
        Ok(())
    }

    fn warn(&self, message: String) {
        tracing::warn!("{}", message);
        self.emit(InstallEvent::Warning(message));
    }

    fn warn_all(&self, messages: Vec<String>) {
        for message in messages {
            self.warn(message);
        }
    }

    fn emit(&self, event: InstallEvent) {
        if let Some(events) = &self.events {
            // the receiving side may have gone away, the run goes on
            let _ = events.send(event);
        }
    }
}
