//! Log setup for the installer.
//!
//! Console output is driven by the `--log-*` options. The `install` command
//! additionally keeps a plain text debug log of the run under
//! `<install_dir>/logs/`, so a failed installation can be inspected afterwards.

use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;
use structopt::StructOpt;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::util::TryInitError;

const DEFAULT_FILTER_LEVEL: LevelFilter = LevelFilter::INFO;
const INSTALL_LOG_LEVEL: LevelFilter = LevelFilter::DEBUG;
const LOG_FILTER_LEVEL_POSSIBLE_VALUES: &[&str] =
    &["off", "trace", "debug", "info", "warn", "error"];

pub struct LogSettings {
    pub config: LogSettingsEntry,
    pub install_log: Option<PathBuf>,
    pub msgs: LogInfoMsg,
}

/// Messages produced while the settings were assembled, to be logged once
/// the subscriber is in place.
pub type LogInfoMsg = Option<Vec<String>>;

#[derive(Clone, Debug, PartialEq)]
pub struct LogSettingsEntry {
    pub level: LevelFilter,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl Default for LogSettingsEntry {
    fn default() -> Self {
        LogSettingsEntry {
            level: DEFAULT_FILTER_LEVEL,
            format: LogFormat::Default,
            output: LogOutput::Stderr,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Format of the console logger.
pub enum LogFormat {
    Default,
    Plain,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Default
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogFormat::Default => "default",
            LogFormat::Plain => "plain",
            LogFormat::Json => "json",
        };
        f.write_str(s)
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &*s.trim().to_lowercase() {
            "plain" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            "default" => Ok(LogFormat::Default),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Output of the console logger.
pub enum LogOutput {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "" => Err("empty log output".to_owned()),
            _ => Ok(LogOutput::File(PathBuf::from(trimmed))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open the log file `{}`", .path.to_string_lossy())]
    FileError {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },
    #[error("failed to create the log directory `{}`", .path.to_string_lossy())]
    DirectoryError {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },
    #[error("failed to set global subscriber")]
    SetGlobalSubscriberError(#[source] TryInitError),
}

fn log_level_parse(level: &str) -> Result<LevelFilter, String> {
    level
        .parse()
        .map_err(|_| format!("Unknown log level value: '{}'", level))
}

#[derive(Debug, Default, StructOpt)]
pub struct CliSettings {
    /// Set log messages minimum severity. Defaults to "info".
    #[structopt(
        long = "log-level",
        global = true,
        parse(try_from_str = log_level_parse),
        possible_values = LOG_FILTER_LEVEL_POSSIBLE_VALUES
    )]
    pub log_level: Option<LevelFilter>,

    /// Set format of the log emitted. Can be "json", "plain" or "default".
    #[structopt(long = "log-format", global = true, parse(try_from_str))]
    pub log_format: Option<LogFormat>,

    /// Where to write the log. Can be "stdout", "stderr" or a file path.
    /// Defaults to "stderr".
    #[structopt(long = "log-output", global = true, parse(try_from_str))]
    pub log_output: Option<LogOutput>,
}

/// `<install_dir>/logs/install_<YYYYmmddTHHMMSSZ>.log`
pub fn install_log_path<P: AsRef<Path>>(install_dir: P, now: SystemTime) -> PathBuf {
    let stamp: String = humantime::format_rfc3339_seconds(now)
        .to_string()
        .chars()
        .filter(|c| *c != '-' && *c != ':')
        .collect();
    install_dir
        .as_ref()
        .join("logs")
        .join(format!("install_{}.log", stamp))
}

impl LogSettings {
    pub fn new(command_line: &CliSettings) -> LogSettings {
        let mut log_config = LogSettingsEntry::default();
        let mut info_msgs: Vec<String> = Vec::new();

        if let Some(output) = &command_line.log_output {
            if &log_config.output != output {
                info_msgs.push(format!(
                    "log output overriden from command line: {:?} replaced with {:?}",
                    log_config.output, output
                ));
            }
            log_config.output = output.clone();
        }
        if let Some(level) = command_line.log_level {
            log_config.level = level;
        }
        if let Some(format) = command_line.log_format {
            log_config.format = format;
        }

        LogSettings {
            config: log_config,
            install_log: None,
            msgs: if info_msgs.is_empty() {
                None
            } else {
                Some(info_msgs)
            },
        }
    }

    /// Also record the whole run at debug level in the given file.
    pub fn with_install_log(mut self, path: PathBuf) -> Self {
        self.install_log = Some(path);
        self
    }

    pub fn init_log(self) -> Result<(Vec<WorkerGuard>, LogInfoMsg), Error> {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{fmt, Layer, Registry};

        let mut guards = Vec::new();

        let sink: Box<dyn io::Write + Send> = match &self.config.output {
            LogOutput::Stdout => Box::new(io::stdout()),
            LogOutput::Stderr => Box::new(io::stderr()),
            LogOutput::File(path) => Box::new(open_append(path)?),
        };
        let (console_writer, guard) = tracing_appender::non_blocking(sink);
        guards.push(guard);

        let console: Box<dyn Layer<Registry> + Send + Sync> = match self.config.format {
            LogFormat::Default => fmt::Layer::new()
                .with_level(true)
                .with_writer(console_writer)
                .with_filter(self.config.level)
                .boxed(),
            LogFormat::Plain => fmt::Layer::new()
                .with_ansi(false)
                .with_level(true)
                .with_writer(console_writer)
                .with_filter(self.config.level)
                .boxed(),
            LogFormat::Json => fmt::Layer::new()
                .json()
                .with_level(true)
                .with_writer(console_writer)
                .with_filter(self.config.level)
                .boxed(),
        };

        let install_layer = match &self.install_log {
            Some(path) => {
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir).map_err(|cause| Error::DirectoryError {
                        path: dir.to_path_buf(),
                        cause,
                    })?;
                }
                let (file_writer, guard) = tracing_appender::non_blocking(open_append(path)?);
                guards.push(guard);
                Some(
                    fmt::Layer::new()
                        .with_ansi(false)
                        .with_level(true)
                        .with_writer(file_writer)
                        .with_filter(INSTALL_LOG_LEVEL),
                )
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(console)
            .with(install_layer)
            .try_init()
            .map_err(Error::SetGlobalSubscriberError)?;

        Ok((guards, self.msgs))
    }
}

fn open_append(path: &Path) -> Result<fs::File, Error> {
    fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(true)
        .open(path)
        .map_err(|cause| Error::FileError {
            path: path.to_path_buf(),
            cause,
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn cli_has_priority() {
        let cli = CliSettings::from_iter(vec![
            "example",
            "--log-level",
            "trace",
            "--log-output",
            "output.log",
        ]);

        let settings = LogSettings::new(&cli);

        assert_eq!(settings.config.level, LevelFilter::TRACE);
        assert_eq!(settings.config.output, LogOutput::File("output.log".into()));
        assert_eq!(settings.config.format, LogFormat::Default);
        assert!(settings.msgs.is_some());
    }

    #[test]
    fn defaults_to_info_on_stderr() {
        let settings = LogSettings::new(&CliSettings::default());
        assert_eq!(settings.config, LogSettingsEntry::default());
        assert_eq!(settings.config.level, LevelFilter::INFO);
        assert!(settings.msgs.is_none());
    }

    #[test]
    fn install_log_is_timestamped_under_logs() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let path = install_log_path("/opt/algorand", now);
        assert_eq!(
            path,
            PathBuf::from("/opt/algorand/logs/install_20231114T221320Z.log")
        );
    }
}
