//! JSON input document reading.
//!
//! # Responsibility
//! - Read one input document (manifest, ownership map, loader plugin) from disk.
//! - Keep the native I/O or parse error together with the offending path.
//!
//! # Invariants
//! - Errors are never reinterpreted: the underlying `io::Error` or
//!   `serde_json::Error` is preserved as `source()`.

use log::debug;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub type InputResult<T> = Result<T, InputError>;

/// Failure to read or parse one input document.
#[derive(Debug)]
pub enum InputError {
    Io { path: PathBuf, source: io::Error },
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl InputError {
    /// Path of the document that failed.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Malformed { path, .. } => path,
        }
    }

    /// Underlying I/O error kind, when the failure came from the filesystem.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            Self::Malformed { .. } => None,
        }
    }
}

impl Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{source}, open '{}'", path.display()),
            Self::Malformed { path, source } => {
                write!(f, "{source}, parse '{}'", path.display())
            }
        }
    }
}

impl Error for InputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Malformed { source, .. } => Some(source),
        }
    }
}

/// Reads `path` as UTF-8 and deserializes it as JSON.
pub fn read_json_document<T: DeserializeOwned>(path: &Path) -> InputResult<T> {
    let raw = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "event=input_read module=input status=ok path={} bytes={}",
        path.display(),
        raw.len()
    );
    serde_json::from_str(&raw).map_err(|source| InputError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
