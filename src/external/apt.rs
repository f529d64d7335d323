use super::process::{privileged, run, run_with_input};
use super::Error;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// A third party APT source together with its signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptRepository {
    /// ASCII armored public key, as published by the vendor.
    pub key: Vec<u8>,
    /// Where the key is stored, under `/etc/apt/trusted.gpg.d/`.
    pub key_path: PathBuf,
    /// Source line handed to `add-apt-repository`.
    pub source: String,
}

pub trait PackageManager {
    /// `apt-get update`
    fn update_index(&self) -> Result<(), Error>;
    /// `dpkg -s <package>`, installed when it exits with success.
    fn is_installed(&self, package: &str) -> bool;
    /// `apt-get install -y <packages...>`
    fn install(&self, packages: &[&str]) -> Result<(), Error>;
    /// Stores the signing key and registers the source line.
    fn add_repository(&self, repository: &AptRepository) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct Apt {
    sudo: bool,
}

impl Apt {
    pub fn new(sudo: bool) -> Self {
        Self { sudo }
    }
}

impl Default for Apt {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PackageManager for Apt {
    fn update_index(&self) -> Result<(), Error> {
        let mut command = privileged(self.sudo, "apt-get");
        command.arg("update");
        run(command).map(|_| ())
    }

    fn is_installed(&self, package: &str) -> bool {
        Command::new("dpkg")
            .arg("-s")
            .arg(package)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn install(&self, packages: &[&str]) -> Result<(), Error> {
        if packages.is_empty() {
            return Ok(());
        }
        let mut command = privileged(self.sudo, "apt-get");
        command.arg("install").arg("-y").args(packages);
        run(command).map(|_| ())
    }

    fn add_repository(&self, repository: &AptRepository) -> Result<(), Error> {
        let mut tee = privileged(self.sudo, "tee");
        tee.arg(&repository.key_path);
        run_with_input(tee, &repository.key)?;

        let mut add = privileged(self.sudo, "add-apt-repository");
        add.arg("-y").arg(&repository.source);
        run(add).map(|_| ())
    }
}
