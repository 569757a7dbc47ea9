//! Ownership matching.
//!
//! # Responsibility
//! - Load the ownership map document.
//! - Join dependency names against owner claims.
//!
//! # Invariants
//! - Every input dependency becomes exactly one report key.
//! - Owner lists follow ownership-map order; matching is exact string equality.
//! - Owners whose value is not a list never match and never fail the load.

use crate::input::{read_json_document, InputResult};
use crate::model::ownership::{OwnerClaims, OwnershipMap, OwnershipReport};
use log::{debug, warn};
use std::path::Path;

/// Reads the owner -> dependencies document at `path`.
pub fn read_ownership_map(path: &Path) -> InputResult<OwnershipMap> {
    let map: OwnershipMap = read_json_document(path)?;
    for (owner, claims) in map.iter() {
        if *claims == OwnerClaims::Ignored {
            warn!(
                "event=ownership_map_entry module=owners status=ignored owner={} reason=not_a_list",
                owner
            );
        }
    }
    debug!(
        "event=ownership_map_read module=owners status=ok owners={}",
        map.len()
    );
    Ok(map)
}

/// Maps each dependency to the owners claiming it.
pub fn match_owners<S: AsRef<str>>(dependencies: &[S], map: &OwnershipMap) -> OwnershipReport {
    let mut report = OwnershipReport::new();
    for dependency in dependencies {
        let dependency = dependency.as_ref();
        let owners = map
            .iter()
            .filter(|(_, claims)| claims.claims(dependency))
            .map(|(owner, _)| owner.to_string())
            .collect();
        report.insert(dependency, owners);
    }
    report
}

/// Dependencies listed in `report` without any owner.
pub fn unowned_dependencies(report: &OwnershipReport) -> Vec<String> {
    report
        .unowned_dependencies()
        .into_iter()
        .map(str::to_string)
        .collect()
}
