//! Control of the installed node service.

use crate::config::NodeArgs;
use crate::external::{self, ServiceManager, Systemctl};
use crate::installer::settings::DEFAULT_SERVICE_NAME;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use thiserror::Error;

pub const NODE_LOG_FILE_NAME: &str = "node.log";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Service(#[from] external::Error),
    #[error("cannot read the node log `{}`", .path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub enum Node {
    /// start the node service
    Start(ServiceArgs),
    /// stop the node service
    Stop(ServiceArgs),
    /// restart the node service
    Restart(ServiceArgs),
    /// print whether the node service is running
    Status(ServiceArgs),
    /// print the end of the node log
    Logs {
        #[structopt(flatten)]
        node: NodeArgs,
        /// number of lines to print
        #[structopt(long, short = "n", default_value = "50")]
        lines: usize,
    },
}

#[derive(StructOpt)]
pub struct ServiceArgs {
    /// systemd service name
    #[structopt(long, default_value = DEFAULT_SERVICE_NAME)]
    service: String,
}

impl Node {
    pub fn exec(self) -> Result<(), Error> {
        let services = Systemctl::default();
        match self {
            Node::Start(args) => services.start(&args.service)?,
            Node::Stop(args) => services.stop(&args.service)?,
            Node::Restart(args) => services.restart(&args.service)?,
            Node::Status(args) => println!("{}", services.status(&args.service)),
            Node::Logs { node, lines } => {
                for line in tail(&node.data_dir.join(NODE_LOG_FILE_NAME), lines)? {
                    println!("{}", line);
                }
            }
        }
        Ok(())
    }
}

/// The last `count` lines of the file at `path`.
pub fn tail(path: &Path, count: usize) -> Result<Vec<String>, Error> {
    let to_error = |source| Error::Log {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(to_error)?);
    let mut last = VecDeque::new();
    for line in reader.lines() {
        let line = line.map_err(to_error)?;
        if count == 0 {
            continue;
        }
        if last.len() == count {
            last.pop_front();
        }
        last.push_back(line);
    }
    Ok(last.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn keeps_the_last_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.child(NODE_LOG_FILE_NAME);
        log.write_str("one\ntwo\nthree\nfour\n").unwrap();

        assert_eq!(tail(log.path(), 2).unwrap(), vec!["three", "four"]);
        assert_eq!(tail(log.path(), 10).unwrap().len(), 4);
        assert!(tail(log.path(), 0).unwrap().is_empty());
    }

    #[test]
    fn huge_count_prints_the_whole_log() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.child(NODE_LOG_FILE_NAME);
        log.write_str("one\ntwo\n").unwrap();

        assert_eq!(tail(log.path(), usize::MAX).unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn missing_log_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            tail(&temp_dir.path().join("absent.log"), 5),
            Err(Error::Log { .. })
        ));
    }
}
