//! Core logic for dependency-owners.
//! Resolves dependency loaders and maps project dependencies to their owners.

pub mod input;
pub mod loader;
pub mod logging;
pub mod model;
pub mod owners;
pub mod service;

pub use input::{read_json_document, InputError, InputResult};
pub use loader::package_json::PackageJsonLoader;
pub use loader::plugin::{CommandLoader, PluginCommand, PluginManifest};
pub use loader::registry::{LoaderRegistry, LoaderRegistryError};
pub use loader::resolver::{LoaderResolver, ResolveError};
pub use loader::{DependencyLoader, LoaderError, LoaderRef, LoaderResult};
pub use logging::{init_logging, logging_status, LogDestination};
pub use model::ownership::{OwnerClaims, OwnershipMap, OwnershipReport};
pub use owners::{match_owners, read_ownership_map, unowned_dependencies};
pub use service::ownership_service::{
    dependency_owners, filter_dependencies, DependencyOwnersError, DependencyOwnersOptions,
    DependencyOwnersResult, DependencyOwnersService, DEFAULT_CONFIG_FILE, DEFAULT_DEPENDENCY_FILE,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
