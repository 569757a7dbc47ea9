//! Dependency loader contract and resolution.
//!
//! # Responsibility
//! - Define the capability every dependency loader satisfies.
//! - Acquire loaders from references, validate them, probe them.
//!
//! # Invariants
//! - `can_load` reports "cannot handle" as `Ok(false)`, never as an error.
//! - A loader acquired from a reference is shape-checked before first use.
//!
//! # See also
//! - `resolver` for the acquisition order.

use crate::input::InputError;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::Path;
use std::sync::Arc;

pub mod package_json;
pub mod plugin;
pub mod registry;
pub mod resolver;

pub type LoaderResult<T> = Result<T, LoaderError>;

/// Extracts dependency identifiers from one manifest format.
pub trait DependencyLoader: Send + Sync {
    /// Returns whether this loader understands `file`.
    fn can_load(&self, file: &Path) -> LoaderResult<bool>;

    /// Returns the dependency names declared in `file`.
    fn load(&self, file: &Path) -> LoaderResult<Vec<String>>;
}

/// Loader supplied by the caller: a bound value or a textual reference.
#[derive(Clone)]
pub enum LoaderRef {
    Value(Arc<dyn DependencyLoader>),
    Reference(String),
}

impl LoaderRef {
    /// Wraps a loader value.
    pub fn value(loader: impl DependencyLoader + 'static) -> Self {
        Self::Value(Arc::new(loader))
    }

    /// Textual reference, when this is not a bound value.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Value(_) => None,
            Self::Reference(reference) => Some(reference.as_str()),
        }
    }
}

impl Default for LoaderRef {
    /// The bundled `package.json` loader.
    fn default() -> Self {
        Self::value(package_json::PackageJsonLoader)
    }
}

impl Debug for LoaderRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(_) => write!(f, "LoaderRef::Value(..)"),
            Self::Reference(reference) => write!(f, "LoaderRef::Reference({reference:?})"),
        }
    }
}

impl From<&str> for LoaderRef {
    fn from(value: &str) -> Self {
        Self::Reference(value.to_string())
    }
}

impl From<String> for LoaderRef {
    fn from(value: String) -> Self {
        Self::Reference(value)
    }
}

impl From<Arc<dyn DependencyLoader>> for LoaderRef {
    fn from(value: Arc<dyn DependencyLoader>) -> Self {
        Self::Value(value)
    }
}

/// Fault raised by a loader while probing or loading.
#[derive(Debug)]
pub enum LoaderError {
    Input(InputError),
    /// External plugin command failed or produced unusable output.
    Plugin {
        reference: String,
        entrypoint: &'static str,
        message: String,
    },
}

impl Display for LoaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input(err) => write!(f, "{err}"),
            Self::Plugin {
                reference,
                entrypoint,
                message,
            } => write!(f, "loader {reference} `{entrypoint}` failed: {message}"),
        }
    }
}

impl Error for LoaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Input(err) => Some(err),
            Self::Plugin { .. } => None,
        }
    }
}

impl From<InputError> for LoaderError {
    fn from(value: InputError) -> Self {
        Self::Input(value)
    }
}
