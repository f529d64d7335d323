//! Adapters over the programs and services the installer drives.
//!
//! Each capability is a trait with one method per external command, so the
//! installer and the managers can run against in-memory doubles. Output
//! grammars are documented on the trait methods and parsed next to the
//! production implementation.

pub mod apt;
pub mod checks;
pub mod diagcfg;
pub mod goal;
pub mod http;
pub mod process;
pub mod systemctl;

pub use self::apt::{Apt, AptRepository, PackageManager};
pub use self::checks::{HostChecks, RequirementsCheck, SystemRequirements};
pub use self::diagcfg::{Diagcfg, Diagnostics};
pub use self::goal::{Goal, NodeCli};
pub use self::http::{Fetch, HttpFetcher};
pub use self::process::ProcessOutput;
pub use self::systemctl::{ServiceManager, ServiceStatus, Systemctl};

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not send input to `{command}`")]
    Stdin {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("request to `{url}` failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("cannot set up the HTTP client")]
    HttpClient(#[source] reqwest::Error),
    #[error("cannot access `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("system requirement not met: {0}")]
    Requirement(String),
    #[error("insufficient permissions: {0}")]
    Permission(String),
}
