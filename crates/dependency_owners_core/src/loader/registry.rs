//! In-process registry of installed dependency loaders.

use crate::loader::package_json::PackageJsonLoader;
use crate::loader::DependencyLoader;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Published name of the bundled `package.json` loader.
pub const PACKAGE_JSON_LOADER_NAME: &str = "@dependency-owners/package-json-loader";
/// Short alias of the bundled `package.json` loader.
pub const PACKAGE_JSON_LOADER_ALIAS: &str = "package-json";

// npm-style package name, optionally scoped.
static LOADER_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:@[a-z0-9][a-z0-9._~-]*/)?[a-z0-9][a-z0-9._~-]*$")
        .expect("valid loader name regex")
});

/// Returns whether `value` is a well-formed loader name.
pub fn is_valid_loader_name(value: &str) -> bool {
    LOADER_NAME_RE.is_match(value) && !value.split('/').any(|segment| segment.contains(".."))
}

/// Loader registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderRegistryError {
    InvalidLoaderName(String),
    DuplicateLoaderName(String),
}

impl Display for LoaderRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLoaderName(value) => write!(f, "loader name is invalid: {value}"),
            Self::DuplicateLoaderName(value) => {
                write!(f, "loader name already registered: {value}")
            }
        }
    }
}

impl Error for LoaderRegistryError {}

/// Loaders addressable by name without touching the filesystem.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: BTreeMap<String, Arc<dyn DependencyLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled loaders under their published names.
    pub fn with_builtin_loaders() -> Self {
        let mut registry = Self::new();
        let package_json: Arc<dyn DependencyLoader> = Arc::new(PackageJsonLoader);
        for name in [PACKAGE_JSON_LOADER_NAME, PACKAGE_JSON_LOADER_ALIAS] {
            registry
                .loaders
                .insert(name.to_string(), Arc::clone(&package_json));
        }
        registry
    }

    /// Registers one loader under `name`.
    pub fn register(
        &mut self,
        name: &str,
        loader: Arc<dyn DependencyLoader>,
    ) -> Result<(), LoaderRegistryError> {
        let name = name.trim().to_string();
        if !is_valid_loader_name(&name) {
            return Err(LoaderRegistryError::InvalidLoaderName(name));
        }
        if self.loaders.contains_key(name.as_str()) {
            return Err(LoaderRegistryError::DuplicateLoaderName(name));
        }

        self.loaders.insert(name, loader);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Returns sorted loader names.
    pub fn loader_names(&self) -> Vec<String> {
        self.loaders.keys().cloned().collect()
    }

    /// Returns one loader by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn DependencyLoader>> {
        self.loaders.get(name.trim()).cloned()
    }
}
