//! Use-case services composing loaders and ownership matching.
//!
//! # Responsibility
//! - Expose the single end-to-end ownership lookup to callers.
//! - Keep file-format and plugin details behind the loader layer.

pub mod ownership_service;
