//! The node command line client, `goal`.
//!
//! Commands are assembled with small builders (`GoalCommand::new(cmd)
//! .account().dump(addr).data_dir(dir).build()`), run by [`Goal`], and their
//! textual output is interpreted by the `parse_*` functions of this module.

use super::process::{run, ProcessOutput};
use super::Error;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct GoalCommand {
    command: Command,
}

impl GoalCommand {
    pub fn new(command: Command) -> Self {
        Self { command }
    }

    pub fn account(mut self) -> AccountCommand {
        self.command.arg("account");
        AccountCommand::new(self.command)
    }

    pub fn clerk(mut self) -> ClerkCommand {
        self.command.arg("clerk");
        ClerkCommand::new(self.command)
    }
}

pub struct AccountCommand {
    command: Command,
}

impl AccountCommand {
    pub fn new(command: Command) -> Self {
        Self { command }
    }

    pub fn new_account(mut self) -> DataDirCommand {
        self.command.arg("new");
        DataDirCommand::new(self.command)
    }

    pub fn list(mut self) -> DataDirCommand {
        self.command.arg("list");
        DataDirCommand::new(self.command)
    }

    pub fn add_part_key<S: Into<String>>(mut self, address: S) -> AddPartKeyCommand {
        self.command.arg("addpartkey").arg("-a").arg(address.into());
        AddPartKeyCommand::new(self.command)
    }

    pub fn list_part_keys(mut self) -> DataDirCommand {
        self.command.arg("listpartkeys");
        DataDirCommand::new(self.command)
    }

    pub fn change_online_status<S: Into<String>>(
        mut self,
        address: S,
    ) -> ChangeOnlineStatusCommand {
        self.command
            .arg("changeonlinestatus")
            .arg("--address")
            .arg(address.into());
        ChangeOnlineStatusCommand::new(self.command)
    }

    pub fn dump<S: Into<String>>(mut self, address: S) -> DataDirCommand {
        self.command.arg("dump").arg("-a").arg(address.into());
        DataDirCommand::new(self.command)
    }
}

pub struct AddPartKeyCommand {
    command: Command,
}

impl AddPartKeyCommand {
    pub fn new(command: Command) -> Self {
        Self { command }
    }

    pub fn round_first_valid(mut self, round: u64) -> Self {
        self.command.arg("--roundFirstValid").arg(round.to_string());
        self
    }

    pub fn round_last_valid(mut self, round: u64) -> Self {
        self.command.arg("--roundLastValid").arg(round.to_string());
        self
    }

    pub fn key_dilution(mut self, dilution: u64) -> Self {
        self.command.arg("--keyDilution").arg(dilution.to_string());
        self
    }

    pub fn data_dir<P: AsRef<Path>>(self, data_dir: P) -> DataDirCommand {
        DataDirCommand::new(self.command).data_dir(data_dir)
    }
}

pub struct ChangeOnlineStatusCommand {
    command: Command,
}

impl ChangeOnlineStatusCommand {
    pub fn new(command: Command) -> Self {
        Self { command }
    }

    pub fn online(mut self, online: bool) -> Self {
        self.command
            .arg(if online { "--online" } else { "--offline" });
        self
    }

    pub fn transaction_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.command.arg("--transaction-file").arg(path.as_ref());
        self
    }

    pub fn data_dir<P: AsRef<Path>>(self, data_dir: P) -> DataDirCommand {
        DataDirCommand::new(self.command).data_dir(data_dir)
    }
}

pub struct ClerkCommand {
    command: Command,
}

impl ClerkCommand {
    pub fn new(command: Command) -> Self {
        Self { command }
    }

    pub fn sign<P: AsRef<Path>, Q: AsRef<Path>>(mut self, input: P, output: Q) -> DataDirCommand {
        self.command
            .arg("sign")
            .arg("-i")
            .arg(input.as_ref())
            .arg("-o")
            .arg(output.as_ref());
        DataDirCommand::new(self.command)
    }
}

pub struct DataDirCommand {
    command: Command,
}

impl DataDirCommand {
    pub fn new(command: Command) -> Self {
        Self { command }
    }

    pub fn data_dir<P: AsRef<Path>>(mut self, data_dir: P) -> Self {
        self.command.arg("-d").arg(data_dir.as_ref());
        self
    }

    pub fn build(self) -> Command {
        self.command
    }
}

pub trait NodeCli {
    /// `goal account new`: `Created new account with address <ADDRESS>`
    fn account_new(&self) -> Result<String, Error>;
    /// `goal account list`: one line per account, see [`parse_account_list`].
    fn account_list(&self) -> Result<String, Error>;
    /// `goal account addpartkey`: free text, only the exit status matters.
    fn add_part_key(
        &self,
        address: &str,
        first_round: u64,
        last_round: u64,
        key_dilution: Option<u64>,
    ) -> Result<String, Error>;
    /// `goal account listpartkeys`: a header line followed by one row per
    /// key, see [`parse_part_keys`].
    fn list_part_keys(&self) -> Result<String, Error>;
    /// `goal account changeonlinestatus`: writes the unsigned transaction to
    /// `transaction_file` without submitting it.
    fn change_online_status(
        &self,
        address: &str,
        online: bool,
        transaction_file: &Path,
    ) -> Result<String, Error>;
    /// `goal account dump`: a JSON record of the account, see
    /// [`parse_dump_online`].
    fn account_dump(&self, address: &str) -> Result<String, Error>;
    /// `goal clerk sign`: free text, writes the signed transaction to `output`.
    fn clerk_sign(&self, input: &Path, output: &Path) -> Result<String, Error>;
}

#[derive(Debug, Clone)]
pub struct Goal {
    program: PathBuf,
    data_dir: PathBuf,
}

impl Goal {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self::with_program("goal", data_dir)
    }

    pub fn with_program<B: Into<PathBuf>, P: Into<PathBuf>>(program: B, data_dir: P) -> Self {
        Self {
            program: program.into(),
            data_dir: data_dir.into(),
        }
    }

    fn goal(&self) -> GoalCommand {
        GoalCommand::new(Command::new(&self.program))
    }

    fn output_text(command: Command) -> Result<String, Error> {
        run(command).map(|output| output.as_lossy_string())
    }
}

impl NodeCli for Goal {
    fn account_new(&self) -> Result<String, Error> {
        let command = self
            .goal()
            .account()
            .new_account()
            .data_dir(&self.data_dir)
            .build();
        Self::output_text(command)
    }

    fn account_list(&self) -> Result<String, Error> {
        let command = self.goal().account().list().data_dir(&self.data_dir).build();
        Self::output_text(command)
    }

    fn add_part_key(
        &self,
        address: &str,
        first_round: u64,
        last_round: u64,
        key_dilution: Option<u64>,
    ) -> Result<String, Error> {
        let mut builder = self
            .goal()
            .account()
            .add_part_key(address)
            .round_first_valid(first_round)
            .round_last_valid(last_round);
        if let Some(dilution) = key_dilution {
            builder = builder.key_dilution(dilution);
        }
        Self::output_text(builder.data_dir(&self.data_dir).build())
    }

    fn list_part_keys(&self) -> Result<String, Error> {
        let command = self
            .goal()
            .account()
            .list_part_keys()
            .data_dir(&self.data_dir)
            .build();
        Self::output_text(command)
    }

    fn change_online_status(
        &self,
        address: &str,
        online: bool,
        transaction_file: &Path,
    ) -> Result<String, Error> {
        let command = self
            .goal()
            .account()
            .change_online_status(address)
            .online(online)
            .transaction_file(transaction_file)
            .data_dir(&self.data_dir)
            .build();
        Self::output_text(command)
    }

    fn account_dump(&self, address: &str) -> Result<String, Error> {
        let command = self
            .goal()
            .account()
            .dump(address)
            .data_dir(&self.data_dir)
            .build();
        Self::output_text(command)
    }

    fn clerk_sign(&self, input: &Path, output: &Path) -> Result<String, Error> {
        let command = self
            .goal()
            .clerk()
            .sign(input, output)
            .data_dir(&self.data_dir)
            .build();
        Self::output_text(command)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no output to parse")]
    Empty,
    #[error("malformed line: `{0}`")]
    MalformedLine(String),
    #[error("account dump is not a JSON record")]
    NotJson,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartKeyInfo {
    pub registered: bool,
    pub participation_id: String,
    pub first_round: u64,
    pub last_round: u64,
}

/// Parses `goal account listpartkeys`.
///
/// ```text
/// Registered  Account      ParticipationID   Last vote  First round  Last round
/// yes         ADDR...      ABCDEF...         N/A        1000         3001000
/// ```
///
/// The first line is a header. Rows are whitespace separated, the columns
/// used are registered (0), account (1), participation id (2), first round (4)
/// and last round (5).
pub fn parse_part_keys(text: &str) -> Result<BTreeMap<String, PartKeyInfo>, ParseError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    if lines.next().is_none() {
        return Err(ParseError::Empty);
    }

    let mut keys = BTreeMap::new();
    for line in lines {
        let malformed = || ParseError::MalformedLine(line.trim().to_owned());
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            return Err(malformed());
        }
        let first_round = parts[4].parse().map_err(|_| malformed())?;
        let last_round = parts[5].parse().map_err(|_| malformed())?;
        keys.insert(
            parts[1].to_owned(),
            PartKeyInfo {
                registered: parts[0].eq_ignore_ascii_case("yes"),
                participation_id: parts[2].to_owned(),
                first_round,
                last_round,
            },
        );
    }
    Ok(keys)
}

/// Parses `goal account dump` and reads its `onl` field.
///
/// The field is `1` (or `true`) for an online account. The node omits it for
/// offline accounts.
pub fn parse_dump_online(text: &str) -> Result<bool, ParseError> {
    let record: serde_json::Value =
        serde_json::from_str(text).map_err(|_| ParseError::NotJson)?;
    let record = record.as_object().ok_or(ParseError::NotJson)?;
    Ok(match record.get("onl") {
        Some(serde_json::Value::Bool(online)) => *online,
        Some(serde_json::Value::Number(status)) => status.as_u64() == Some(1),
        _ => false,
    })
}

/// Parses `goal account new`, the address is the last word of the output.
pub fn parse_new_account(text: &str) -> Result<String, ParseError> {
    text.split_whitespace()
        .last()
        .map(str::to_owned)
        .ok_or(ParseError::Empty)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountEntry {
    pub status: String,
    pub name: String,
    pub address: String,
}

/// Parses `goal account list`.
///
/// ```text
/// [offline]	Unnamed-0	ADDR...	0 microAlgos	*Default
/// ```
///
/// Lines not starting with a bracketed status are ignored.
pub fn parse_account_list(text: &str) -> Vec<AccountEntry> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let rest = line.strip_prefix('[')?;
            let (status, rest) = rest.split_at(rest.find(']')?);
            let mut words = rest[1..].split_whitespace();
            let name = words.next()?;
            let address = words.next()?;
            Some(AccountEntry {
                status: status.to_owned(),
                name: name.to_owned(),
                address: address.to_owned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::process::describe;

    const LISTING: &str = "\
Registered\tAccount\tParticipationID\tLast vote\tFirst round\tLast round\tKey dilution
yes\tAAAA\tP1\tN/A\t1000\t3001000\t1733
no\tBBBB\tP2\t12\t5\t500\t10000
";

    #[test]
    fn add_part_key_command_line() {
        let command = GoalCommand::new(Command::new("goal"))
            .account()
            .add_part_key("ADDR")
            .round_first_valid(1)
            .round_last_valid(100)
            .key_dilution(10)
            .data_dir("/var/lib/algorand")
            .build();
        assert_eq!(
            describe(&command),
            "goal account addpartkey -a ADDR --roundFirstValid 1 --roundLastValid 100 --keyDilution 10 -d /var/lib/algorand"
        );
    }

    #[test]
    fn change_online_status_command_line() {
        let command = GoalCommand::new(Command::new("goal"))
            .account()
            .change_online_status("ADDR")
            .online(false)
            .transaction_file("/data/offline.txn")
            .data_dir("/data")
            .build();
        assert_eq!(
            describe(&command),
            "goal account changeonlinestatus --address ADDR --offline --transaction-file /data/offline.txn -d /data"
        );
    }

    #[test]
    fn part_keys_are_keyed_by_address() {
        let keys = parse_part_keys(LISTING).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(
            keys["AAAA"],
            PartKeyInfo {
                registered: true,
                participation_id: "P1".to_owned(),
                first_round: 1000,
                last_round: 3_001_000,
            }
        );
        assert!(!keys["BBBB"].registered);
    }

    #[test]
    fn header_only_listing_is_empty() {
        let keys = parse_part_keys("Registered Account ParticipationID\n").unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn malformed_listing_is_rejected() {
        assert_eq!(parse_part_keys(""), Err(ParseError::Empty));
        assert!(matches!(
            parse_part_keys("header\nyes AAAA P1 N/A notanumber 10\n"),
            Err(ParseError::MalformedLine(_))
        ));
        assert!(matches!(
            parse_part_keys("header\ntoo short\n"),
            Err(ParseError::MalformedLine(_))
        ));
    }

    #[test]
    fn dump_online_field() {
        assert_eq!(parse_dump_online(r#"{"onl": 1, "algo": 5}"#), Ok(true));
        assert_eq!(parse_dump_online(r#"{"onl": true}"#), Ok(true));
        assert_eq!(parse_dump_online(r#"{"onl": 2}"#), Ok(false));
        assert_eq!(parse_dump_online(r#"{"algo": 5}"#), Ok(false));
        assert_eq!(parse_dump_online("error: unknown"), Err(ParseError::NotJson));
        assert_eq!(parse_dump_online("[1]"), Err(ParseError::NotJson));
    }

    #[test]
    fn new_account_address() {
        assert_eq!(
            parse_new_account("Created new account with address XYZ\n").unwrap(),
            "XYZ"
        );
        assert_eq!(parse_new_account("  \n"), Err(ParseError::Empty));
    }

    #[test]
    fn account_list_entries() {
        let text = "[offline]\tUnnamed-0\tADDR0\t0 microAlgos\t*Default\n[online]\tmain\tADDR1\t5 microAlgos\nnot an account\n";
        let accounts = parse_account_list(text);
        assert_eq!(
            accounts,
            vec![
                AccountEntry {
                    status: "offline".to_owned(),
                    name: "Unnamed-0".to_owned(),
                    address: "ADDR0".to_owned(),
                },
                AccountEntry {
                    status: "online".to_owned(),
                    name: "main".to_owned(),
                    address: "ADDR1".to_owned(),
                },
            ]
        );
    }
}
