use crate::config::{self, ConfigStore, TelemetryConfig};
use crate::external::diagcfg::{status_matches, DISABLED_PHRASES, ENABLED_PHRASES};
use crate::external::process::hand_over;
use crate::external::{self, Diagnostics, ServiceManager, ServiceStatus};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("cannot write the telemetry configuration")]
    Write(#[source] config::Error),
    #[error("cannot hand the user level telemetry settings over to `{owner}`")]
    Ownership {
        owner: String,
        #[source]
        source: external::Error,
    },
    #[error("diagnostics command failed")]
    Diagnostics(#[source] external::Error),
    #[error("telemetry status `{status}` does not confirm the change")]
    UnexpectedStatus { status: String },
    #[error("cannot restart the node service")]
    Restart(#[source] external::Error),
    #[error("node service is {status} after restart")]
    NotRunning { status: ServiceStatus },
}

/// Applies the telemetry choice to the node and checks it took effect.
///
/// The documents are written, `diagcfg` switches remote logging, its status
/// must then contain one of the accepted phrases, and after a restart and a
/// fixed wait the service must be running.
pub struct TelemetryVerification<'a> {
    store: &'a ConfigStore,
    diagnostics: &'a dyn Diagnostics,
    services: &'a dyn ServiceManager,
    service_name: &'a str,
    restart_delay: Duration,
    global_owner: Option<String>,
}

impl<'a> TelemetryVerification<'a> {
    pub fn new(
        store: &'a ConfigStore,
        diagnostics: &'a dyn Diagnostics,
        services: &'a dyn ServiceManager,
        service_name: &'a str,
    ) -> Self {
        Self {
            store,
            diagnostics,
            services,
            service_name,
            restart_delay: Duration::from_secs(5),
            global_owner: None,
        }
    }

    pub fn restart_delay(&mut self, restart_delay: Duration) -> &mut Self {
        self.restart_delay = restart_delay;
        self
    }

    /// `diagcfg` runs as this user and must be able to rewrite the user level
    /// document.
    pub fn global_owner(&mut self, owner: Option<String>) -> &mut Self {
        self.global_owner = owner;
        self
    }

    pub fn apply(&self, enable: bool, name: Option<&str>) -> Result<TelemetryConfig, TelemetryError> {
        let document = self
            .store
            .configure_telemetry(enable, name)
            .map_err(TelemetryError::Write)?;
        let settings = self.store.telemetry_settings();
        if let (Some(owner), Some(dir)) = (&self.global_owner, settings.global_dir()) {
            hand_over(owner, dir).map_err(|source| TelemetryError::Ownership {
                owner: owner.clone(),
                source,
            })?;
        }

        let accepted = if enable {
            self.diagnostics
                .telemetry_name(&document.name)
                .map_err(TelemetryError::Diagnostics)?;
            ENABLED_PHRASES
        } else {
            self.diagnostics
                .telemetry_disable()
                .map_err(TelemetryError::Diagnostics)?;
            DISABLED_PHRASES
        };

        let status = self
            .diagnostics
            .telemetry_status()
            .map_err(TelemetryError::Diagnostics)?;
        if !status_matches(&status, accepted) {
            return Err(TelemetryError::UnexpectedStatus { status });
        }
        tracing::info!(%status, "telemetry status confirmed");

        self.services
            .restart(self.service_name)
            .map_err(TelemetryError::Restart)?;
        std::thread::sleep(self.restart_delay);
        match self.services.status(self.service_name) {
            ServiceStatus::Running => Ok(document),
            status => Err(TelemetryError::NotRunning { status }),
        }
    }
}
