//! Dependency ownership lookup service.
//!
//! # Responsibility
//! - Resolve a loader, read the ownership map, load and filter dependencies,
//!   then match owners.
//!
//! # Invariants
//! - Steps run strictly in that order; the first failure aborts the lookup.
//! - Relative paths resolve against the service working directory.
//! - Nothing is cached between calls.

use crate::input::InputError;
use crate::loader::resolver::{LoaderResolver, ResolveError};
use crate::loader::{LoaderError, LoaderRef};
use crate::model::ownership::OwnershipReport;
use crate::owners::{match_owners, read_ownership_map};
use log::{error, info};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Default dependency file name, relative to the working directory.
pub const DEFAULT_DEPENDENCY_FILE: &str = "package.json";
/// Default ownership map file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dependency-owners.json";

pub type DependencyOwnersResult<T> = Result<T, DependencyOwnersError>;

/// Failure of an ownership lookup.
#[derive(Debug)]
pub enum DependencyOwnersError {
    /// Process working directory could not be determined.
    WorkingDirectory(io::Error),
    Resolve(ResolveError),
    /// The loader declined the dependency file.
    NoLoaderFound { dependency_file: PathBuf },
    /// Ownership map could not be read or parsed.
    OwnershipMap(InputError),
    /// The resolved loader failed while loading.
    Load(LoaderError),
}

impl Display for DependencyOwnersError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WorkingDirectory(err) => {
                write!(f, "failed to determine working directory: {err}")
            }
            Self::Resolve(err) => write!(f, "{err}"),
            Self::NoLoaderFound { dependency_file } => {
                write!(f, "no loader found for file: {}", dependency_file.display())
            }
            Self::OwnershipMap(err) => write!(f, "{err}"),
            Self::Load(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DependencyOwnersError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WorkingDirectory(err) => Some(err),
            Self::Resolve(err) => Some(err),
            Self::NoLoaderFound { .. } => None,
            Self::OwnershipMap(err) => Some(err),
            Self::Load(err) => Some(err),
        }
    }
}

impl From<ResolveError> for DependencyOwnersError {
    fn from(value: ResolveError) -> Self {
        Self::Resolve(value)
    }
}

impl From<LoaderError> for DependencyOwnersError {
    fn from(value: LoaderError) -> Self {
        Self::Load(value)
    }
}

/// Options for one ownership lookup.
#[derive(Debug, Clone, Default)]
pub struct DependencyOwnersOptions {
    /// Dependency file; defaults to `package.json` in the working directory.
    pub dependency_file: Option<PathBuf>,
    /// Ownership map; defaults to `dependency-owners.json` in the working directory.
    pub config_file: Option<PathBuf>,
    /// Dependencies to keep; empty keeps all.
    pub dependencies: Vec<String>,
    /// Loader to use; defaults to the bundled `package.json` loader.
    pub loader: Option<LoaderRef>,
}

impl DependencyOwnersOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dependency_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.dependency_file = Some(path.into());
        self
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn loader(mut self, loader: impl Into<LoaderRef>) -> Self {
        self.loader = Some(loader.into());
        self
    }
}

/// Ownership lookup bound to one working directory and loader resolver.
pub struct DependencyOwnersService {
    resolver: LoaderResolver,
}

impl DependencyOwnersService {
    /// Service for `cwd` with the built-in loader registry.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self::with_resolver(LoaderResolver::new(cwd))
    }

    pub fn with_resolver(resolver: LoaderResolver) -> Self {
        Self { resolver }
    }

    pub fn cwd(&self) -> &Path {
        self.resolver.cwd()
    }

    /// Computes dependency -> owners for the configured files.
    ///
    /// # Errors
    /// - `Resolve` when the loader reference cannot be acquired, validated or probed.
    /// - `NoLoaderFound` when the loader declines the dependency file.
    /// - `OwnershipMap` when the ownership map cannot be read or parsed.
    /// - `Load` when the loader fails to read the dependency file.
    pub fn compute_ownership(
        &self,
        options: &DependencyOwnersOptions,
    ) -> DependencyOwnersResult<OwnershipReport> {
        let started_at = Instant::now();
        let dependency_file =
            self.path_or_default(&options.dependency_file, DEFAULT_DEPENDENCY_FILE);
        let config_file = self.path_or_default(&options.config_file, DEFAULT_CONFIG_FILE);
        info!(
            "event=ownership_lookup module=service status=start dependency_file={} config_file={}",
            dependency_file.display(),
            config_file.display()
        );

        match self.run_lookup(options, &dependency_file, &config_file) {
            Ok(report) => {
                info!(
                    "event=ownership_lookup module=service status=ok duration_ms={} dependencies={} unowned={}",
                    started_at.elapsed().as_millis(),
                    report.len(),
                    report.unowned_dependencies().len()
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    "event=ownership_lookup module=service status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn run_lookup(
        &self,
        options: &DependencyOwnersOptions,
        dependency_file: &Path,
        config_file: &Path,
    ) -> DependencyOwnersResult<OwnershipReport> {
        let loader = options.loader.clone().unwrap_or_default();
        let Some(loader) = self.resolver.resolve(&loader, dependency_file)? else {
            return Err(DependencyOwnersError::NoLoaderFound {
                dependency_file: dependency_file.to_path_buf(),
            });
        };

        let ownership_map =
            read_ownership_map(config_file).map_err(DependencyOwnersError::OwnershipMap)?;
        let dependencies = loader.load(dependency_file)?;
        let dependencies = filter_dependencies(dependencies, &options.dependencies);
        Ok(match_owners(dependencies.as_slice(), &ownership_map))
    }

    fn path_or_default(&self, path: &Option<PathBuf>, default_name: &str) -> PathBuf {
        match path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.cwd().join(path),
            None => self.cwd().join(default_name),
        }
    }
}

/// Keeps dependencies present in `allowlist`; an empty allowlist keeps all.
pub fn filter_dependencies(dependencies: Vec<String>, allowlist: &[String]) -> Vec<String> {
    if allowlist.is_empty() {
        return dependencies;
    }
    let allowed: BTreeSet<&str> = allowlist.iter().map(String::as_str).collect();
    dependencies
        .into_iter()
        .filter(|dependency| allowed.contains(dependency.as_str()))
        .collect()
}

/// Computes ownership relative to the process working directory.
///
/// # Errors
/// - `WorkingDirectory` when the process working directory is unavailable.
/// - Otherwise see [`DependencyOwnersService::compute_ownership`].
pub fn dependency_owners(
    options: &DependencyOwnersOptions,
) -> DependencyOwnersResult<OwnershipReport> {
    let cwd = std::env::current_dir().map_err(DependencyOwnersError::WorkingDirectory)?;
    DependencyOwnersService::new(cwd).compute_ownership(options)
}
