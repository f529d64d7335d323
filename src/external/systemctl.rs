use super::process::{describe, privileged, run, run_with_input, ProcessOutput};
use super::Error;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Running,
    Stopped,
    Error,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Reads the `Active:` line of `systemctl status`.
///
/// `active (running)` is running, `inactive (dead)` is stopped, anything else
/// (failed, activating, unknown unit) is an error.
pub fn parse_status(text: &str) -> ServiceStatus {
    if text.contains("active (running)") {
        ServiceStatus::Running
    } else if text.contains("inactive (dead)") {
        ServiceStatus::Stopped
    } else {
        ServiceStatus::Error
    }
}

pub trait ServiceManager {
    fn start(&self, service: &str) -> Result<(), Error>;
    fn stop(&self, service: &str) -> Result<(), Error>;
    fn restart(&self, service: &str) -> Result<(), Error>;
    fn enable(&self, service: &str) -> Result<(), Error>;
    /// `systemctl status <service>`, see [`parse_status`].
    fn status(&self, service: &str) -> ServiceStatus;
    /// Writes `<service>.service` and reloads the unit files.
    fn install_unit(&self, service: &str, unit: &str) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct Systemctl {
    sudo: bool,
    unit_dir: PathBuf,
}

impl Systemctl {
    pub fn new(sudo: bool) -> Self {
        Self {
            sudo,
            unit_dir: PathBuf::from(DEFAULT_UNIT_DIR),
        }
    }

    fn action(&self, action: &str, service: &str) -> Result<(), Error> {
        let mut command = privileged(self.sudo, "systemctl");
        command.arg(action).arg(service);
        run(command).map(|_| ())
    }
}

impl Default for Systemctl {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ServiceManager for Systemctl {
    fn start(&self, service: &str) -> Result<(), Error> {
        self.action("start", service)
    }

    fn stop(&self, service: &str) -> Result<(), Error> {
        self.action("stop", service)
    }

    fn restart(&self, service: &str) -> Result<(), Error> {
        self.action("restart", service)
    }

    fn enable(&self, service: &str) -> Result<(), Error> {
        self.action("enable", service)
    }

    fn status(&self, service: &str) -> ServiceStatus {
        // a stopped unit makes `systemctl status` exit with 3, so the exit
        // code is not checked here
        let mut command = privileged(false, "systemctl");
        command.arg("status").arg(service).arg("--no-pager");
        match command.output() {
            Ok(output) => parse_status(&output.as_lossy_string()),
            Err(error) => {
                tracing::warn!(command = %describe(&command), reason = %error, "cannot query service");
                ServiceStatus::Error
            }
        }
    }

    fn install_unit(&self, service: &str, unit: &str) -> Result<(), Error> {
        let mut tee = privileged(self.sudo, "tee");
        tee.arg(self.unit_dir.join(format!("{}.service", service)));
        run_with_input(tee, unit.as_bytes())?;

        let mut reload = privileged(self.sudo, "systemctl");
        reload.arg("daemon-reload");
        run(reload).map(|_| ())
    }
}
