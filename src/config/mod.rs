pub mod kmd;
pub mod node;
pub mod telemetry;

pub use self::kmd::KmdConfig;
pub use self::node::{NodeConfig, NodeConfigUpdate};
pub use self::telemetry::{TelemetryConfig, TelemetrySettings};

use crate::utils::io::{self, ensure_dir, read_json, write_json};
use crate::utils::{output_format, OutputFormat};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use thiserror::Error;

pub const DEFAULT_DATA_DIR: &str = "/var/lib/algorand";
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot load the node configuration")]
    Load(#[source] io::Error),
    #[error("cannot save the node configuration")]
    Save(#[source] io::Error),
    #[error("cannot write the telemetry configuration")]
    Telemetry(#[source] io::Error),
    #[error("cannot write the kmd configuration")]
    Kmd(#[source] io::Error),
    #[error("cannot set permissions of `{}`", .path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid setting `{0}`, expected KEY=VALUE")]
    InvalidSetting(String),
    #[error("invalid configuration update")]
    InvalidUpdate(#[source] serde_json::Error),
    #[error("kmd session lifetime of {minutes} minutes is too long")]
    SessionLifetime { minutes: u64 },
    #[error("cannot read the telemetry password")]
    Password(#[source] std::io::Error),
    #[error(transparent)]
    Output(#[from] output_format::Error),
}

/// The node configuration of one data directory.
///
/// Starts from the built-in defaults for the node's role. An existing
/// `config.json` can be merged in with [`ConfigStore::load_existing`], further
/// changes are applied with [`ConfigStore::update`] and nothing reaches the
/// disk before [`ConfigStore::save`].
#[derive(Debug, Clone)]
pub struct ConfigStore {
    data_dir: PathBuf,
    is_relay: bool,
    global_telemetry_dir: Option<PathBuf>,
    config: NodeConfig,
}

impl ConfigStore {
    pub fn new<P: Into<PathBuf>>(data_dir: P, is_relay: bool) -> Self {
        ConfigStore {
            data_dir: data_dir.into(),
            is_relay,
            global_telemetry_dir: telemetry::default_global_dir(),
            config: NodeConfig::for_role(is_relay),
        }
    }

    /// Where the user level telemetry document goes, `~/.algorand` by default.
    pub fn with_global_telemetry_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.global_telemetry_dir = dir;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn is_relay(&self) -> bool {
        self.is_relay
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE_NAME)
    }

    /// Merges the saved `config.json` onto the current settings.
    ///
    /// Returns `false` when there is no saved document. On error the current
    /// settings are left untouched.
    pub fn load_existing(&mut self) -> Result<bool, Error> {
        let path = self.config_path();
        if !path.is_file() {
            return Ok(false);
        }
        let saved: NodeConfigUpdate = read_json(&path).map_err(Error::Load)?;
        self.config.merge(saved);
        tracing::debug!(path = %path.display(), "merged existing node configuration");
        Ok(true)
    }

    pub fn update(&mut self, update: NodeConfigUpdate) {
        self.config.merge(update);
    }

    pub fn save(&self) -> Result<(), Error> {
        let path = self.config_path();
        let result = ensure_dir(&self.data_dir)
            .and_then(|()| write_json(&path, &self.config))
            .map_err(Error::Save);
        match &result {
            Ok(()) => tracing::info!(path = %path.display(), "node configuration saved"),
            Err(error) => {
                tracing::error!(path = %path.display(), reason = %error, "failed to save node configuration")
            }
        }
        result
    }

    pub fn telemetry_settings(&self) -> TelemetrySettings {
        TelemetrySettings::new(self.global_telemetry_dir.clone(), self.data_dir.clone())
    }

    /// Writes a fresh telemetry document to the user level and node level
    /// locations. `config.json` is not modified.
    pub fn configure_telemetry(
        &self,
        enable: bool,
        hostname: Option<&str>,
    ) -> Result<TelemetryConfig, Error> {
        let document = TelemetryConfig::new(enable, hostname);
        self.write_telemetry(&document)?;
        Ok(document)
    }

    pub fn write_telemetry(&self, document: &TelemetryConfig) -> Result<Vec<PathBuf>, Error> {
        let written = self.telemetry_settings().write(document)?;
        tracing::info!(enable = document.enable, name = %document.name, "telemetry configured");
        Ok(written)
    }

    pub fn configure_kmd(&self, port: u16, token_validity_minutes: u64) -> Result<KmdConfig, Error> {
        let kmd = KmdConfig::new(port, token_validity_minutes)?;
        let path = KmdConfig::path(&self.data_dir);
        if let Some(dir) = path.parent() {
            ensure_dir(dir).map_err(Error::Kmd)?;
        }
        write_json(&path, &kmd).map_err(Error::Kmd)?;
        tracing::info!(address = %kmd.address, "kmd configured");
        Ok(kmd)
    }
}

#[derive(Debug, StructOpt)]
pub struct NodeArgs {
    /// node data directory
    #[structopt(
        long = "data-dir",
        short = "d",
        default_value = DEFAULT_DATA_DIR,
        parse(from_os_str)
    )]
    pub data_dir: PathBuf,
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub enum Config {
    /// print the effective node configuration
    Show {
        #[structopt(flatten)]
        node: NodeArgs,
        /// use the relay defaults
        #[structopt(long)]
        relay: bool,
        #[structopt(flatten)]
        output_format: OutputFormat,
    },
    /// change node settings, e.g. `Archival=true GossipFanout=8`
    Set {
        #[structopt(flatten)]
        node: NodeArgs,
        /// use the relay defaults for settings not saved yet
        #[structopt(long)]
        relay: bool,
        #[structopt(name = "KEY=VALUE", required = true)]
        settings: Vec<String>,
    },
    /// write the key management daemon configuration
    Kmd {
        #[structopt(flatten)]
        node: NodeArgs,
        #[structopt(long, default_value = "7833")]
        port: u16,
        /// validity of kmd session tokens
        #[structopt(long = "session-minutes", default_value = "60")]
        session_minutes: u64,
    },
    /// write the telemetry configuration
    Telemetry(TelemetryArgs),
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct TelemetryArgs {
    #[structopt(flatten)]
    node: NodeArgs,
    /// turn remote logging on
    #[structopt(long)]
    enable: bool,
    /// name reported for this node, defaults to the host name
    #[structopt(long)]
    name: Option<String>,
    /// telemetry endpoint
    #[structopt(long)]
    uri: Option<String>,
    #[structopt(long)]
    user_name: Option<String>,
    /// prompt for the telemetry endpoint password
    #[structopt(long)]
    ask_password: bool,
    /// user level settings directory, defaults to ~/.algorand
    #[structopt(long, parse(from_os_str))]
    global_dir: Option<PathBuf>,
}

impl Config {
    pub fn exec(self) -> Result<(), Error> {
        match self {
            Config::Show {
                node,
                relay,
                output_format,
            } => {
                let mut store = ConfigStore::new(node.data_dir, relay);
                load_or_warn(&mut store);
                println!("{}", output_format.format(store.config())?);
                Ok(())
            }
            Config::Set {
                node,
                relay,
                settings,
            } => {
                let update = NodeConfigUpdate::from_pairs(&settings)?;
                let mut store = ConfigStore::new(node.data_dir, relay);
                store.load_existing()?;
                store.update(update);
                store.save()
            }
            Config::Kmd {
                node,
                port,
                session_minutes,
            } => {
                let store = ConfigStore::new(node.data_dir, false);
                let kmd = store.configure_kmd(port, session_minutes)?;
                println!("{}", OutputFormat::json().format(&kmd)?);
                Ok(())
            }
            Config::Telemetry(args) => args.exec(),
        }
    }
}

impl TelemetryArgs {
    fn exec(self) -> Result<(), Error> {
        let mut store = ConfigStore::new(self.node.data_dir, false);
        if let Some(dir) = self.global_dir {
            store = store.with_global_telemetry_dir(Some(dir));
        }
        let mut document = TelemetryConfig::new(self.enable, self.name.as_deref());
        if let Some(uri) = self.uri {
            document.uri = uri;
        }
        if let Some(user_name) = self.user_name {
            document.user_name = user_name;
        }
        if self.ask_password {
            document.password = rpassword::read_password_from_tty(Some("Telemetry password: "))
                .map_err(Error::Password)?;
        }
        for path in store.write_telemetry(&document)? {
            println!("{}", path.display());
        }
        Ok(())
    }
}

/// Best effort reload, a broken document leaves the defaults in place.
pub fn load_or_warn(store: &mut ConfigStore) -> bool {
    match store.load_existing() {
        Ok(found) => found,
        Err(error) => {
            tracing::warn!(
                path = %store.config_path().display(),
                reason = %error,
                "ignoring unreadable node configuration"
            );
            false
        }
    }
}
