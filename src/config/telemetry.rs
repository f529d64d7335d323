//! The node's remote logging settings, `logging.config`.
//!
//! The same document lives in two places: the invoking user's `~/.algorand`
//! and the node's data directory. Only `FilePath` differs between the copies.

use super::Error;
use crate::utils::io::{ensure_dir, write_json};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const TELEMETRY_FILE_NAME: &str = "logging.config";
const DEFAULT_MIN_LOG_LEVEL: u32 = 2;
const DEFAULT_REPORT_HISTORY_LEVEL: u32 = 3;
const FALLBACK_HOSTNAME: &str = "algorand-node";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TelemetryConfig {
    pub enable: bool,
    pub send_to_log: bool,
    #[serde(rename = "URI")]
    pub uri: String,
    pub name: String,
    #[serde(rename = "GUID")]
    pub guid: String,
    pub min_log_level: u32,
    pub report_history_level: u32,
    pub file_path: PathBuf,
    pub user_name: String,
    pub password: String,
}

impl TelemetryConfig {
    pub fn new(enable: bool, name: Option<&str>) -> Self {
        TelemetryConfig {
            enable,
            send_to_log: false,
            uri: String::new(),
            name: name.map(str::to_owned).unwrap_or_else(hostname),
            guid: generate_guid(&mut rand::thread_rng()),
            min_log_level: DEFAULT_MIN_LOG_LEVEL,
            report_history_level: DEFAULT_REPORT_HISTORY_LEVEL,
            file_path: PathBuf::new(),
            user_name: String::new(),
            password: String::new(),
        }
    }
}

/// Random (version 4) UUID in its hyphenated form.
pub fn generate_guid<R: RngCore>(rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let hex = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

pub fn hostname() -> String {
    fs::read_to_string("/proc/sys/kernel/hostname")
        .ok()
        .map(|name| name.trim().to_owned())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_HOSTNAME.to_owned())
}

/// `~/.algorand`, where `diagcfg` keeps the user level settings.
pub fn default_global_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".algorand"))
}

/// Destinations a telemetry document is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    global_dir: Option<PathBuf>,
    node_dir: PathBuf,
}

impl TelemetrySettings {
    pub fn new(global_dir: Option<PathBuf>, node_dir: PathBuf) -> Self {
        Self {
            global_dir,
            node_dir,
        }
    }

    /// User level settings directory, `~/.algorand` usually.
    pub fn global_dir(&self) -> Option<&Path> {
        self.global_dir.as_deref()
    }

    pub fn node_path(&self) -> PathBuf {
        self.node_dir.join(TELEMETRY_FILE_NAME)
    }

    pub fn destinations(&self) -> Vec<PathBuf> {
        self.global_dir
            .iter()
            .map(|dir| dir.join(TELEMETRY_FILE_NAME))
            .chain(std::iter::once(self.node_path()))
            .collect()
    }

    /// Writes `document` to every destination with `FilePath` set to that
    /// destination. The node copy is made readable by the service account.
    pub fn write(&self, document: &TelemetryConfig) -> Result<Vec<PathBuf>, Error> {
        let destinations = self.destinations();
        for path in &destinations {
            if let Some(dir) = path.parent() {
                ensure_dir(dir).map_err(Error::Telemetry)?;
            }
            let mut copy = document.clone();
            copy.file_path = path.clone();
            write_json(path, &copy).map_err(Error::Telemetry)?;
            tracing::debug!(path = %path.display(), "telemetry configuration written");
        }
        make_world_readable(&self.node_path())?;
        Ok(destinations)
    }
}

#[cfg(unix)]
fn make_world_readable(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt as _;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644)).map_err(|source| {
        Error::Permissions {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn make_world_readable(_path: &Path) -> Result<(), Error> {
    Ok(())
}
