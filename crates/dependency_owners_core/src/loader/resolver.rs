//! Loader reference resolution.
//!
//! # Responsibility
//! - Acquire a loader from a textual reference in a fixed tier order.
//! - Shape-check acquired plugin manifests before any entrypoint runs.
//! - Probe the validated loader against the dependency file.
//!
//! # Invariants
//! - Tier 1 (installed: registry, loader directories, absolute path) always
//!   runs before tier 2 (working-directory relative); first hit wins.
//! - Acquisition, shape and probe failures are reported separately.
//! - "Cannot handle this file" is `Ok(None)`, never an error.
//! - The working directory is an explicit input, never read from the process.

use crate::input::read_json_document;
use crate::loader::plugin::{CommandLoader, PluginManifest};
use crate::loader::registry::{is_valid_loader_name, LoaderRegistry};
use crate::loader::{DependencyLoader, LoaderError, LoaderRef};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name looked up inside a loader directory package.
pub const PACKAGE_MANIFEST_FILE_NAME: &str = "loader.json";

/// Failure to turn a loader reference into a usable loader.
#[derive(Debug)]
pub enum ResolveError {
    /// Neither acquisition tier produced a module.
    ImportFailed { reference: String },
    /// The acquired module does not expose `canLoad` and `load`.
    InvalidLoader {
        reference: String,
        missing: Vec<&'static str>,
    },
    /// The loader's own `can_load` probe failed.
    Probe(LoaderError),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImportFailed { reference } => {
                write!(f, "failed to import loader: {reference}")
            }
            Self::InvalidLoader { reference, missing } => write!(
                f,
                "invalid loader: {reference}. The module does not export 'canLoad' and 'load' entrypoints (missing: {})",
                missing.join(", ")
            ),
            Self::Probe(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ImportFailed { .. } | Self::InvalidLoader { .. } => None,
            Self::Probe(err) => Some(err),
        }
    }
}

/// Acquisition tier that produced a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionTier {
    /// Registered name, loader directory package, or absolute path.
    Installed,
    /// Path relative to the working directory.
    WorkingDirectory,
}

impl AcquisitionTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::WorkingDirectory => "cwd",
        }
    }
}

/// Module obtained from a reference, before shape validation.
pub enum AcquiredModule {
    /// Registered loader; conforms by construction.
    Registered(Arc<dyn DependencyLoader>),
    /// Plugin manifest read from disk.
    Manifest(PluginManifest),
}

/// Outcome of one acquisition tier.
pub enum TierOutcome {
    Found(AcquiredModule),
    NotFound,
}

/// Resolves loader references for one working directory.
#[derive(Clone)]
pub struct LoaderResolver {
    cwd: PathBuf,
    registry: LoaderRegistry,
    loader_dirs: Vec<PathBuf>,
}

impl LoaderResolver {
    /// Resolver with the built-in registry and no loader directories.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            registry: LoaderRegistry::with_builtin_loaders(),
            loader_dirs: Vec::new(),
        }
    }

    pub fn with_registry(mut self, registry: LoaderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Directories searched for installed plugin manifests, in order.
    pub fn with_loader_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let loader_dirs = dirs
            .into_iter()
            .map(|dir| absolutize(&self.cwd, dir.into()))
            .collect();
        self.loader_dirs = loader_dirs;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Returns a loader able to read `file`, or `None` when it declines.
    ///
    /// # Errors
    /// - `ImportFailed` when a string reference cannot be acquired.
    /// - `InvalidLoader` when the acquired module lacks the contract.
    /// - `Probe` when `can_load` itself fails.
    pub fn resolve(
        &self,
        loader: &LoaderRef,
        file: &Path,
    ) -> Result<Option<Arc<dyn DependencyLoader>>, ResolveError> {
        let resolved = match loader {
            LoaderRef::Value(loader) => Arc::clone(loader),
            LoaderRef::Reference(reference) => {
                let module = self.acquire(reference)?;
                self.validate(reference, module)?
            }
        };

        let handles = resolved.can_load(file).map_err(ResolveError::Probe)?;
        if !handles {
            info!(
                "event=loader_probe module=loader status=declined file={}",
                file.display()
            );
            return Ok(None);
        }
        debug!(
            "event=loader_probe module=loader status=ok file={}",
            file.display()
        );
        Ok(Some(resolved))
    }

    /// Acquires a module for `reference`, trying each tier in order.
    pub fn acquire(&self, reference: &str) -> Result<AcquiredModule, ResolveError> {
        for tier in [AcquisitionTier::Installed, AcquisitionTier::WorkingDirectory] {
            match self.acquire_from(tier, reference) {
                TierOutcome::Found(module) => {
                    debug!(
                        "event=loader_acquire module=loader status=ok tier={} reference={}",
                        tier.as_str(),
                        reference
                    );
                    return Ok(module);
                }
                TierOutcome::NotFound => debug!(
                    "event=loader_acquire module=loader status=miss tier={} reference={}",
                    tier.as_str(),
                    reference
                ),
            }
        }

        warn!(
            "event=loader_acquire module=loader status=error reference={}",
            reference
        );
        Err(ResolveError::ImportFailed {
            reference: reference.to_string(),
        })
    }

    /// Runs a single acquisition tier.
    pub fn acquire_from(&self, tier: AcquisitionTier, reference: &str) -> TierOutcome {
        match tier {
            AcquisitionTier::Installed => self.acquire_installed(reference),
            AcquisitionTier::WorkingDirectory => read_manifest(&self.cwd.join(reference)),
        }
    }

    fn acquire_installed(&self, reference: &str) -> TierOutcome {
        if let Some(loader) = self.registry.get(reference) {
            return TierOutcome::Found(AcquiredModule::Registered(loader));
        }

        if is_valid_loader_name(reference) {
            for dir in &self.loader_dirs {
                let candidates = [
                    dir.join(format!("{reference}.json")),
                    dir.join(reference).join(PACKAGE_MANIFEST_FILE_NAME),
                ];
                for candidate in candidates {
                    if let found @ TierOutcome::Found(_) = read_manifest(&candidate) {
                        return found;
                    }
                }
            }
        }

        let path = Path::new(reference);
        if path.is_absolute() {
            return read_manifest(path);
        }
        TierOutcome::NotFound
    }

    fn validate(
        &self,
        reference: &str,
        module: AcquiredModule,
    ) -> Result<Arc<dyn DependencyLoader>, ResolveError> {
        let manifest = match module {
            AcquiredModule::Registered(loader) => return Ok(loader),
            AcquiredModule::Manifest(manifest) => manifest,
        };

        match manifest.validate() {
            Ok((can_load, load)) => Ok(Arc::new(CommandLoader::new(
                reference,
                &manifest.path,
                &self.cwd,
                can_load,
                load,
            ))),
            Err(missing) => {
                warn!(
                    "event=loader_validate module=loader status=error reference={} missing={}",
                    reference,
                    missing.join(",")
                );
                Err(ResolveError::InvalidLoader {
                    reference: reference.to_string(),
                    missing,
                })
            }
        }
    }
}

fn absolutize(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

fn read_manifest(path: &Path) -> TierOutcome {
    if !path.is_file() {
        return TierOutcome::NotFound;
    }
    match read_json_document(path) {
        Ok(document) => TierOutcome::Found(AcquiredModule::Manifest(PluginManifest {
            path: path.to_path_buf(),
            document,
        })),
        Err(err) => {
            debug!(
                "event=loader_manifest_read module=loader status=error path={} error={}",
                path.display(),
                err
            );
            TierOutcome::NotFound
        }
    }
}
