//! Shell completion scripts for the `algoinstall` command line.
use clap::Shell;
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use thiserror::Error;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct AutoCompletion {
    /// shell to generate the completion script for (bash, zsh, fish...)
    shell: Shell,

    /// existing directory the completion script is written to
    #[structopt(parse(from_os_str))]
    output: PathBuf,
}

impl AutoCompletion {
    pub fn exec<S: StructOpt>(self) -> Result<(), Error> {
        validate_output(&self.output)?;
        S::clap().gen_completions(env!("CARGO_PKG_NAME"), self.shell, self.output);
        Ok(())
    }
}

fn validate_output(output: &Path) -> Result<(), Error> {
    if !output.exists() {
        return Err(Error::OutputNotExist(output.to_path_buf()));
    }
    if !output.is_dir() {
        return Err(Error::OutputNotDir(output.to_path_buf()));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("output directory `{}` does not exist", .0.display())]
    OutputNotExist(PathBuf),
    #[error("output `{}` is not a directory", .0.display())]
    OutputNotDir(PathBuf),
}
