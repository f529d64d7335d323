use serde::{de::DeserializeOwned, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read file `{}`", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write file `{}`", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file `{}` is not a valid JSON document", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot serialize document for `{}`", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, Error> {
    let path = path.as_ref();
    let content = fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serializes the whole document first, writes it next to the target and
/// renames it into place, so readers never observe a half written file.
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<(), Error> {
    let path = path.as_ref();
    let mut content = serde_json::to_vec_pretty(value).map_err(|source| Error::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    content.push(b'\n');
    write_atomic(path, &content)
}

/// Writes `content` next to `path` and renames it into place. A failed or
/// interrupted write never leaves a truncated file at `path`.
pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<(), Error> {
    let path = path.as_ref();
    let tmp = sibling_tmp_path(path);
    fs::write(&tmp, content).map_err(|source| Error::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Creates `dir` and its parents, succeeding when it already exists.
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<(), Error> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| Error::Write {
        path: dir.to_path_buf(),
        source,
    })
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| "document".as_ref()));
    name.push(".tmp");
    path.with_file_name(name)
}
