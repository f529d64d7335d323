use crate::config::DEFAULT_DATA_DIR;
use crate::external::process::{self, ProcessOutput};
use crate::network::Network;
use crate::utils::io::{self, ensure_dir, read_json, write_json};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

pub const DEFAULT_INSTALL_DIR: &str = "/opt/algorand";
pub const DEFAULT_BIN_DIR: &str = "/usr/bin";
pub const SETTINGS_FILE_NAME: &str = "installer_config.json";
pub const DEFAULT_SERVICE_NAME: &str = "algorand";
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);
const PASSWD_FILE: &str = "/etc/passwd";

/// The choices an installation is carried out with.
///
/// Saved as `installer_config.json` in the install directory so a later run
/// starts from the same choices. Fields missing from a saved document take
/// their default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    pub install_dir: PathBuf,
    pub data_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub network: Network,
    pub relay: bool,
    pub archival: bool,
    pub telemetry: bool,
}

impl Default for InstallSettings {
    fn default() -> Self {
        InstallSettings {
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bin_dir: PathBuf::from(DEFAULT_BIN_DIR),
            network: Network::default(),
            relay: false,
            archival: false,
            telemetry: false,
        }
    }
}

impl InstallSettings {
    pub fn path<P: AsRef<Path>>(install_dir: P) -> PathBuf {
        install_dir.as_ref().join(SETTINGS_FILE_NAME)
    }

    /// The settings saved in `install_dir`, if any.
    pub fn load<P: AsRef<Path>>(install_dir: P) -> Result<Option<Self>, io::Error> {
        let path = Self::path(install_dir);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(path).map(Some)
    }

    pub fn save(&self) -> Result<(), io::Error> {
        ensure_dir(&self.install_dir)?;
        write_json(Self::path(&self.install_dir), self)
    }

    /// A relay always keeps the full ledger.
    pub fn normalized(mut self) -> Self {
        if self.relay {
            self.archival = true;
        }
        self
    }
}

/// Run time details of the host the installer needs besides the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    pub service_name: String,
    pub service_user: String,
    pub service_group: String,
    /// Home of the invoking user, for `~/.bashrc` and `~/.algorand`.
    pub home_dir: Option<PathBuf>,
    /// Set when running through `sudo`: files written under `home_dir` are
    /// handed over to this `user:` with `chown`.
    pub home_owner: Option<String>,
    /// Name reported by telemetry, the host name when `None`.
    pub telemetry_name: Option<String>,
    /// Wait between restarting the node and checking that it runs.
    pub restart_delay: Duration,
}

impl InstallOptions {
    /// Options for the user running the installer, through `sudo` or not.
    pub fn from_env() -> Self {
        let sudo_user = std::env::var("SUDO_USER").ok();
        let user = sudo_user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "root".to_owned());
        Self::for_user(
            sudo_user,
            &user,
            std::env::var_os("HOME").map(PathBuf::from),
            &passwd_entries(&user),
        )
    }

    /// Options for `user`, with `home` the `HOME` of the installer process.
    ///
    /// Under `sudo`, `HOME` belongs to root and the home directory is looked
    /// up in `passwd` instead.
    pub fn for_user(
        sudo_user: Option<String>,
        user: &str,
        home: Option<PathBuf>,
        passwd: &str,
    ) -> Self {
        let through_sudo = sudo_user.map_or(false, |sudo_user| !sudo_user.is_empty());
        let home_dir = match passwd_home(passwd, user) {
            Some(home) => Some(home),
            None if through_sudo => None,
            None => home,
        };
        InstallOptions {
            service_name: DEFAULT_SERVICE_NAME.to_owned(),
            service_user: user.to_owned(),
            service_group: user.to_owned(),
            home_dir,
            home_owner: if through_sudo {
                Some(format!("{}:", user))
            } else {
                None
            },
            telemetry_name: None,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }
}

/// `getent passwd <user>`, or `/etc/passwd` when `getent` is not available.
fn passwd_entries(user: &str) -> String {
    let mut getent = Command::new("getent");
    getent.arg("passwd").arg(user);
    match process::run(getent) {
        Ok(output) => output.as_lossy_string(),
        Err(error) => {
            tracing::debug!(%user, reason = %error, "falling back to /etc/passwd");
            std::fs::read_to_string(PASSWD_FILE).unwrap_or_default()
        }
    }
}

/// Home directory of `user` in `passwd(5)` formatted text.
pub fn passwd_home(passwd: &str, user: &str) -> Option<PathBuf> {
    passwd
        .lines()
        .map(|line| line.split(':').collect::<Vec<_>>())
        .find(|fields| fields.len() >= 7 && fields[0] == user)
        .map(|fields| fields[5])
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}
