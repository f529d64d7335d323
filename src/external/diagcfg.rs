use super::process::{run, ProcessOutput};
use super::Error;
use std::path::PathBuf;
use std::process::Command;

/// Phrases `diagcfg telemetry` prints once remote logging is off.
pub const DISABLED_PHRASES: &[&str] = &["is disabled", "currently disabled"];
/// Phrases `diagcfg telemetry` prints once remote logging is on.
pub const ENABLED_PHRASES: &[&str] = &["is enabled", "currently enabled"];

/// Whether `status` contains one of `accepted`, ignoring case.
pub fn status_matches(status: &str, accepted: &[&str]) -> bool {
    let status = status.to_lowercase();
    accepted.iter().any(|phrase| status.contains(phrase))
}

pub trait Diagnostics {
    fn telemetry_disable(&self) -> Result<String, Error>;
    fn telemetry_enable(&self) -> Result<String, Error>;
    /// `diagcfg telemetry name -n <name>`, also turns remote logging on.
    fn telemetry_name(&self, name: &str) -> Result<String, Error>;
    /// `diagcfg telemetry`: one line such as
    /// `Remote logging is currently disabled`.
    fn telemetry_status(&self) -> Result<String, Error>;
}

/// Runs `diagcfg` as the service account, against the node's data directory.
#[derive(Debug, Clone)]
pub struct Diagcfg {
    program: PathBuf,
    data_dir: PathBuf,
    run_as: Option<String>,
}

impl Diagcfg {
    pub fn new<P: Into<PathBuf>>(data_dir: P, run_as: Option<String>) -> Self {
        Self {
            program: PathBuf::from("diagcfg"),
            data_dir: data_dir.into(),
            run_as,
        }
    }

    fn telemetry(&self) -> Command {
        let mut command = match &self.run_as {
            Some(user) => {
                let mut command = Command::new("sudo");
                command.arg("-u").arg(user).arg("-H").arg("-E").arg(&self.program);
                command
            }
            None => Command::new(&self.program),
        };
        command
            .env("ALGORAND_DATA", &self.data_dir)
            .arg("telemetry");
        command
    }

    fn output_text(command: Command) -> Result<String, Error> {
        run(command).map(|output| output.as_single_line())
    }
}

impl Diagnostics for Diagcfg {
    fn telemetry_disable(&self) -> Result<String, Error> {
        let mut command = self.telemetry();
        command.arg("disable");
        Self::output_text(command)
    }

    fn telemetry_enable(&self) -> Result<String, Error> {
        let mut command = self.telemetry();
        command.arg("enable");
        Self::output_text(command)
    }

    fn telemetry_name(&self, name: &str) -> Result<String, Error> {
        let mut command = self.telemetry();
        command.arg("name").arg("-n").arg(name);
        Self::output_text(command)
    }

    fn telemetry_status(&self) -> Result<String, Error> {
        Self::output_text(self.telemetry())
    }
}
