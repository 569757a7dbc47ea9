//! Ownership map and ownership report types.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Formatter;

/// Claims one owner makes in the ownership map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerClaims {
    /// Dependency identifiers listed under the owner.
    Listed(Vec<String>),
    /// Value was not an array; the owner never matches anything.
    Ignored,
}

impl OwnerClaims {
    /// Returns whether this owner claims `dependency` by exact match.
    pub fn claims(&self, dependency: &str) -> bool {
        match self {
            Self::Listed(dependencies) => dependencies.iter().any(|value| value == dependency),
            Self::Ignored => false,
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            // Why: non-string elements can never equal a dependency name.
            Value::Array(items) => Self::Listed(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(name) => Some(name),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => Self::Ignored,
        }
    }
}

/// Owner -> dependency list configuration, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipMap {
    entries: Vec<(String, OwnerClaims)>,
}

impl OwnershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an owner with listed dependencies.
    ///
    /// A repeated owner replaces the earlier claims in place, matching JSON
    /// object semantics.
    pub fn insert_listed<I, S>(&mut self, owner: impl Into<String>, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let claims = OwnerClaims::Listed(dependencies.into_iter().map(Into::into).collect());
        self.insert(owner.into(), claims);
    }

    /// Appends an owner whose value is not a dependency list.
    pub fn insert_ignored(&mut self, owner: impl Into<String>) {
        self.insert(owner.into(), OwnerClaims::Ignored);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates owners in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OwnerClaims)> {
        self.entries
            .iter()
            .map(|(owner, claims)| (owner.as_str(), claims))
    }

    pub fn claims(&self, owner: &str) -> Option<&OwnerClaims> {
        self.entries
            .iter()
            .find(|(name, _)| name == owner)
            .map(|(_, claims)| claims)
    }

    fn insert(&mut self, owner: String, claims: OwnerClaims) {
        match self.entries.iter_mut().find(|(name, _)| *name == owner) {
            Some(entry) => entry.1 = claims,
            None => self.entries.push((owner, claims)),
        }
    }
}

impl<'de> Deserialize<'de> for OwnershipMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OwnershipMapVisitor)
    }
}

struct OwnershipMapVisitor;

impl<'de> Visitor<'de> for OwnershipMapVisitor {
    type Value = OwnershipMap;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "an object mapping owners to dependency lists")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OwnershipMap::new();
        while let Some((owner, value)) = access.next_entry::<String, Value>()? {
            map.insert(owner, OwnerClaims::from_value(value));
        }
        Ok(map)
    }
}

/// Dependency -> owners report.
///
/// Keys keep first-insertion order; serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipReport {
    entries: Vec<(String, Vec<String>)>,
    index: BTreeMap<String, usize>,
}

impl OwnershipReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records owners for a dependency.
    ///
    /// A repeated dependency keeps its first position and takes the new owners.
    pub fn insert(&mut self, dependency: impl Into<String>, owners: Vec<String>) {
        let dependency = dependency.into();
        match self.index.get(dependency.as_str()) {
            Some(position) => self.entries[*position].1 = owners,
            None => {
                self.index.insert(dependency.clone(), self.entries.len());
                self.entries.push((dependency, owners));
            }
        }
    }

    pub fn get(&self, dependency: &str) -> Option<&[String]> {
        self.index
            .get(dependency)
            .map(|position| self.entries[*position].1.as_slice())
    }

    pub fn contains(&self, dependency: &str) -> bool {
        self.index.contains_key(dependency)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(dependency, owners)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(dependency, owners)| (dependency.as_str(), owners.as_slice()))
    }

    pub fn dependencies(&self) -> Vec<&str> {
        self.iter().map(|(dependency, _)| dependency).collect()
    }

    /// Dependencies with no owner, in report order.
    pub fn unowned_dependencies(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, owners)| owners.is_empty())
            .map(|(dependency, _)| dependency)
            .collect()
    }
}

impl Serialize for OwnershipReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (dependency, owners) in &self.entries {
            map.serialize_entry(dependency, owners)?;
        }
        map.end()
    }
}
