//! Host requirement and permission checks run before anything is installed.

use super::process::{run, ProcessOutput};
use super::Error;
use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;

const KIB_PER_GIB: u64 = 1024 * 1024;
/// Node ports: gossip, relay gossip and REST API.
pub const NODE_PORTS: &[u16] = &[4160, 4161, 8080];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemRequirements {
    pub min_ubuntu: (u32, u32),
    pub min_cpus: usize,
    pub min_memory_kib: u64,
    pub min_disk_kib: u64,
}

impl Default for SystemRequirements {
    fn default() -> Self {
        Self {
            min_ubuntu: (18, 4),
            min_cpus: 4,
            min_memory_kib: 4 * KIB_PER_GIB,
            min_disk_kib: 10 * KIB_PER_GIB,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub version_id: String,
}

/// What was observed on the host, `None` when it could not be determined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFacts {
    pub os: Option<OsRelease>,
    pub cpus: usize,
    pub memory_kib: Option<u64>,
    pub disk_kib: Option<u64>,
}

pub fn parse_os_release(text: &str) -> OsRelease {
    let mut release = OsRelease::default();
    for line in text.lines() {
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').to_owned();
            match key.trim() {
                "ID" => release.id = value,
                "VERSION_ID" => release.version_id = value,
                _ => {}
            }
        }
    }
    release
}

/// Compares a `major.minor` release number against `min`.
pub fn version_at_least(version: &str, min: (u32, u32)) -> bool {
    let mut parts = version.split('.').map(|part| part.parse::<u32>());
    match (parts.next(), parts.next()) {
        (Some(Ok(major)), Some(Ok(minor))) => (major, minor) >= min,
        (Some(Ok(major)), None) => (major, 0) >= min,
        _ => false,
    }
}

/// `MemTotal:  16318248 kB` from `/proc/meminfo`.
pub fn parse_mem_total_kib(text: &str) -> Option<u64> {
    text.lines()
        .find(|line| line.starts_with("MemTotal:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|value| value.parse().ok())
}

/// Available column of `df -Pk <path>`, in KiB.
pub fn parse_df_available_kib(text: &str) -> Option<u64> {
    text.lines()
        .nth(1)
        .and_then(|line| line.split_whitespace().nth(3))
        .and_then(|value| value.parse().ok())
}

impl SystemRequirements {
    pub fn evaluate(&self, facts: &HostFacts) -> Result<(), Error> {
        let os = facts
            .os
            .as_ref()
            .ok_or_else(|| Error::Requirement("cannot identify the operating system".to_owned()))?;
        if !os.id.eq_ignore_ascii_case("ubuntu") {
            return Err(Error::Requirement(format!(
                "Ubuntu is required, found `{}`",
                os.id
            )));
        }
        if !version_at_least(&os.version_id, self.min_ubuntu) {
            return Err(Error::Requirement(format!(
                "Ubuntu {}.{:02} or newer is required, found {}",
                self.min_ubuntu.0, self.min_ubuntu.1, os.version_id
            )));
        }
        if facts.cpus < self.min_cpus {
            return Err(Error::Requirement(format!(
                "at least {} CPU cores are required, found {}",
                self.min_cpus, facts.cpus
            )));
        }
        match facts.memory_kib {
            Some(memory) if memory >= self.min_memory_kib => {}
            Some(memory) => {
                return Err(Error::Requirement(format!(
                    "at least {} GiB of memory is required, found {} KiB",
                    self.min_memory_kib / KIB_PER_GIB,
                    memory
                )))
            }
            None => return Err(Error::Requirement("cannot read total memory".to_owned())),
        }
        match facts.disk_kib {
            Some(disk) if disk >= self.min_disk_kib => Ok(()),
            Some(disk) => Err(Error::Requirement(format!(
                "at least {} GiB of free disk space is required, found {} KiB",
                self.min_disk_kib / KIB_PER_GIB,
                disk
            ))),
            None => Err(Error::Requirement("cannot read free disk space".to_owned())),
        }
    }
}

pub trait RequirementsCheck {
    fn check_system(&self) -> Result<(), Error>;
    /// Fails when the installer cannot act on the host. Returned strings are
    /// warnings for conditions that do not prevent installing.
    fn check_permissions(&self, install_dir: &Path) -> Result<Vec<String>, Error>;
}

#[derive(Debug, Clone)]
pub struct HostChecks {
    requirements: SystemRequirements,
    disk_path: PathBuf,
}

impl HostChecks {
    pub fn new(requirements: SystemRequirements, disk_path: PathBuf) -> Self {
        Self {
            requirements,
            disk_path,
        }
    }

    pub fn gather(&self) -> HostFacts {
        let os = fs::read_to_string("/etc/os-release")
            .ok()
            .map(|text| parse_os_release(&text));
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let memory_kib = fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|text| parse_mem_total_kib(&text));
        let mut df = Command::new("df");
        df.arg("-Pk").arg(&self.disk_path);
        let disk_kib = run(df)
            .ok()
            .and_then(|output| parse_df_available_kib(&output.as_lossy_string()));
        HostFacts {
            os,
            cpus,
            memory_kib,
            disk_kib,
        }
    }
}

impl RequirementsCheck for HostChecks {
    fn check_system(&self) -> Result<(), Error> {
        let facts = self.gather();
        tracing::debug!(?facts, "host facts");
        self.requirements.evaluate(&facts)
    }

    fn check_permissions(&self, install_dir: &Path) -> Result<Vec<String>, Error> {
        let mut sudo = Command::new("sudo");
        sudo.arg("-n").arg("true");
        run(sudo).map_err(|_| {
            Error::Permission("password-less sudo is required to install packages".to_owned())
        })?;

        fs::create_dir_all(install_dir).map_err(|source| Error::Io {
            path: install_dir.to_path_buf(),
            source,
        })?;
        let probe = install_dir.join(".write_test");
        fs::write(&probe, b"").map_err(|_| {
            Error::Permission(format!("`{}` is not writable", install_dir.display()))
        })?;
        fs::remove_file(&probe).map_err(|source| Error::Io {
            path: probe.clone(),
            source,
        })?;

        Ok(NODE_PORTS
            .iter()
            .filter(|port| TcpListener::bind(("0.0.0.0", **port)).is_err())
            .map(|port| format!("port {} is already in use", port))
            .collect())
    }
}
