//! Reference loader for npm `package.json` manifests.

use crate::input::read_json_document;
use crate::loader::{DependencyLoader, LoaderResult};
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use std::fmt::Formatter;
use std::path::Path;

/// Manifest file name handled by [`PackageJsonLoader`].
pub const PACKAGE_JSON_FILE_NAME: &str = "package.json";

/// Reads `dependencies` then `devDependencies` from `package.json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageJsonLoader;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    #[serde(default)]
    dependencies: Option<DeclaredNames>,
    #[serde(default)]
    dev_dependencies: Option<DeclaredNames>,
}

/// Keys of a JSON object in declaration order; values are skipped.
#[derive(Debug)]
struct DeclaredNames(Vec<String>);

impl<'de> Deserialize<'de> for DeclaredNames {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DeclaredNamesVisitor)
    }
}

struct DeclaredNamesVisitor;

impl<'de> Visitor<'de> for DeclaredNamesVisitor {
    type Value = DeclaredNames;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "an object of dependency names to version ranges")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut names = Vec::new();
        while let Some((name, IgnoredAny)) = access.next_entry::<String, IgnoredAny>()? {
            names.push(name);
        }
        Ok(DeclaredNames(names))
    }
}

impl DependencyLoader for PackageJsonLoader {
    fn can_load(&self, file: &Path) -> LoaderResult<bool> {
        Ok(file
            .file_name()
            .is_some_and(|name| name == PACKAGE_JSON_FILE_NAME))
    }

    fn load(&self, file: &Path) -> LoaderResult<Vec<String>> {
        let manifest: PackageManifest = read_json_document(file)?;
        let mut seen = BTreeSet::new();
        Ok(manifest
            .dependencies
            .into_iter()
            .chain(manifest.dev_dependencies)
            .flat_map(|section| section.0)
            .filter(|name| !name.is_empty() && seen.insert(name.clone()))
            .collect())
    }
}
