//! Migration orchestrator.
//!
//! Walks every entity of every kind across the live world, its compendium
//! bundles, and scene-embedded overrides; invokes the matching entity
//! migrator from `sprawl-core`; and applies each non-empty patch through
//! the host, one entity at a time, isolating failures to the entity that
//! raised them.

pub mod error;
pub mod orchestrator;
pub mod report;

pub use error::{EntityError, MigrateError};
pub use orchestrator::{MigrationOptions, Migrator};
pub use report::{MigrationFailure, MigrationReport, PhaseStats};
