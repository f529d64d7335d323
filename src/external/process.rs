use super::Error;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

pub trait ProcessOutput {
    fn as_lossy_string(&self) -> String;
    fn as_single_line(&self) -> String;
    fn err_as_lossy_string(&self) -> String;
    fn err_as_single_line(&self) -> String;
}

impl ProcessOutput for Output {
    fn as_lossy_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    fn as_single_line(&self) -> String {
        self.as_lossy_string().trim().to_string()
    }

    fn err_as_lossy_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    fn err_as_single_line(&self) -> String {
        self.err_as_lossy_string().trim().to_string()
    }
}

/// `program arg1 arg2 ...`, for logs and error messages.
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prefixes `program` with `sudo` when `sudo` is set.
pub fn privileged(sudo: bool, program: &str) -> Command {
    if sudo {
        let mut command = Command::new("sudo");
        command.arg(program);
        command
    } else {
        Command::new(program)
    }
}

/// Runs the command to completion and fails on a non zero exit status.
pub fn run(mut command: Command) -> Result<Output, Error> {
    let description = describe(&command);
    tracing::debug!(command = %description, "running external command");
    let output = command.output().map_err(|source| Error::Spawn {
        command: description.clone(),
        source,
    })?;
    check_status(description, output)
}

/// Like [`run`], feeding `input` to the command's standard input.
pub fn run_with_input(mut command: Command, input: &[u8]) -> Result<Output, Error> {
    let description = describe(&command);
    tracing::debug!(command = %description, "running external command");
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::Spawn {
            command: description.clone(),
            source,
        })?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).map_err(|source| Error::Stdin {
            command: description.clone(),
            source,
        })?;
    }
    let output = child.wait_with_output().map_err(|source| Error::Spawn {
        command: description.clone(),
        source,
    })?;
    check_status(description, output)
}

/// `chown -R <owner> <path>`, for files written on behalf of another user.
pub fn hand_over(owner: &str, path: &Path) -> Result<(), Error> {
    let mut chown = Command::new("chown");
    chown.arg("-R").arg(owner).arg(path);
    run(chown).map(|_| ())
}

fn check_status(command: String, output: Output) -> Result<Output, Error> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(Error::Failed {
            command,
            status: output.status,
            stderr: output.err_as_single_line(),
        })
    }
}
