//! Ownership domain model.
//!
//! # Responsibility
//! - Define the owner -> dependencies configuration shape.
//! - Define the dependency -> owners report returned to callers.
//!
//! # Invariants
//! - Both mappings preserve document/insertion order.
//! - A report key always maps to a (possibly empty) owner list.

pub mod ownership;
