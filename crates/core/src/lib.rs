//! Pure domain logic for the sprawl schema-migration engine.
//!
//! This crate has zero host dependencies (no async, no I/O). It provides:
//!
//! - Entity document types with closed kind/subtype enums
//! - The sparse dotted-path [`patch::Patch`] type
//! - Field transform rules, one per legacy shape
//! - Per-kind entity migrators that merge rule patches bottom-up
//! - Schema version constants and the migration gate

pub mod document;
pub mod error;
pub mod migrator;
pub mod patch;
pub mod rules;
pub mod version;

pub use error::{CoreError, CoreResult};
