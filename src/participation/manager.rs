use super::Error;
use crate::external::goal::{parse_dump_online, parse_part_keys, NodeCli, PartKeyInfo};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Longest validity range accepted without an explicit confirmation.
pub const SOFT_ROUND_CEILING: u64 = 3_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityRange {
    pub first: u64,
    pub last: u64,
    pub dilution: Option<u64>,
    confirmed: bool,
}

impl ValidityRange {
    pub fn new(first: u64, last: u64) -> Self {
        Self {
            first,
            last,
            dilution: None,
            confirmed: false,
        }
    }

    pub fn with_dilution(mut self, dilution: Option<u64>) -> Self {
        self.dilution = dilution;
        self
    }

    /// Accept a range longer than [`SOFT_ROUND_CEILING`].
    pub fn confirmed(mut self) -> Self {
        self.confirmed = true;
        self
    }

    pub fn length(&self) -> u64 {
        self.last.saturating_sub(self.first)
    }

    pub fn exceeds_soft_ceiling(&self) -> bool {
        self.length() > SOFT_ROUND_CEILING
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    Online,
    Offline,
    Unknown,
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParticipationStatus::Online => "online",
            ParticipationStatus::Offline => "offline",
            ParticipationStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Participation key operations, all carried out by the node CLI.
pub struct ParticipationManager<'a> {
    data_dir: PathBuf,
    cli: &'a dyn NodeCli,
}

impl<'a> ParticipationManager<'a> {
    pub fn new<P: Into<PathBuf>>(data_dir: P, cli: &'a dyn NodeCli) -> Self {
        Self {
            data_dir: data_dir.into(),
            cli,
        }
    }

    /// Generates a participation key for `address`.
    ///
    /// The order of the rounds is not checked here. A range longer than
    /// [`SOFT_ROUND_CEILING`] is refused unless it was confirmed.
    pub fn generate(&self, address: &str, range: ValidityRange) -> Result<(), Error> {
        if range.exceeds_soft_ceiling() {
            if !range.confirmed {
                return Err(Error::RangeNeedsConfirmation {
                    length: range.length(),
                });
            }
            tracing::warn!(
                %address,
                rounds = range.length(),
                "validity range exceeds the recommended maximum"
            );
        }

        self.cli
            .add_part_key(address, range.first, range.last, range.dilution)
            .map_err(|source| {
                tracing::error!(%address, reason = %source, "failed to generate participation key");
                Error::Generate {
                    address: address.to_owned(),
                    source,
                }
            })?;
        tracing::info!(%address, first = range.first, last = range.last, "participation key generated");
        Ok(())
    }

    /// Keys installed on the node, by account address. Empty when the listing
    /// cannot be obtained or understood.
    pub fn list(&self) -> BTreeMap<String, PartKeyInfo> {
        let keys = self
            .cli
            .list_part_keys()
            .map_err(|error| error.to_string())
            .and_then(|text| parse_part_keys(&text).map_err(|error| error.to_string()));
        match keys {
            Ok(keys) => keys,
            Err(reason) => {
                tracing::error!(%reason, "failed to list participation keys");
                BTreeMap::new()
            }
        }
    }

    /// Writes an unsigned transaction bringing `address` online, returns its path.
    pub fn register_online(&self, address: &str) -> Result<PathBuf, Error> {
        self.change_online_status(address, true)
    }

    /// Writes an unsigned transaction taking `address` offline, returns its path.
    pub fn register_offline(&self, address: &str) -> Result<PathBuf, Error> {
        self.change_online_status(address, false)
    }

    fn change_online_status(&self, address: &str, online: bool) -> Result<PathBuf, Error> {
        let status = if online { "online" } else { "offline" };
        let transaction_file = self.data_dir.join(format!("{}.txn", status));
        self.cli
            .change_online_status(address, online, &transaction_file)
            .map_err(|source| {
                tracing::error!(%address, reason = %source, "failed to create {} registration", status);
                Error::Registration {
                    address: address.to_owned(),
                    status,
                    source,
                }
            })?;
        tracing::info!(%address, path = %transaction_file.display(), "created {} registration transaction", status);
        Ok(transaction_file)
    }

    pub fn check_participation_status(&self, address: &str) -> ParticipationStatus {
        let online = self
            .cli
            .account_dump(address)
            .map_err(|error| error.to_string())
            .and_then(|text| parse_dump_online(&text).map_err(|error| error.to_string()));
        match online {
            Ok(true) => ParticipationStatus::Online,
            Ok(false) => ParticipationStatus::Offline,
            Err(reason) => {
                tracing::error!(%address, %reason, "failed to check participation status");
                ParticipationStatus::Unknown
            }
        }
    }
}
