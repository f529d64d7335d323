use super::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_KMD_PORT: u16 = 7833;
pub const DEFAULT_SESSION_MINUTES: u64 = 60;
const KMD_DIR: &str = "kmd-v0.5";
const KMD_FILE_NAME: &str = "kmd_config.json";

/// Key management daemon settings, `kmd-v0.5/kmd_config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmdConfig {
    pub address: String,
    pub allowed_origins: Vec<String>,
    pub session_lifetime_secs: u64,
}

impl KmdConfig {
    pub fn new(port: u16, token_validity_minutes: u64) -> Result<Self, Error> {
        let session_lifetime_secs = token_validity_minutes
            .checked_mul(60)
            .ok_or(Error::SessionLifetime {
                minutes: token_validity_minutes,
            })?;
        Ok(KmdConfig {
            address: format!("127.0.0.1:{}", port),
            allowed_origins: Vec::new(),
            session_lifetime_secs,
        })
    }

    pub fn path<P: AsRef<Path>>(data_dir: P) -> PathBuf {
        data_dir.as_ref().join(KMD_DIR).join(KMD_FILE_NAME)
    }
}

impl Default for KmdConfig {
    fn default() -> Self {
        KmdConfig {
            address: format!("127.0.0.1:{}", DEFAULT_KMD_PORT),
            allowed_origins: Vec::new(),
            session_lifetime_secs: DEFAULT_SESSION_MINUTES * 60,
        }
    }
}
