use thiserror::Error;

use sprawl_core::CoreError;
use sprawl_host::HostError;

/// Batch-fatal errors. The only one in normal operation is unavailability
/// of an entity-listing service; per-entity failures land in the report.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Everything that can fail one entity's migration: rule detection on
/// malformed legacy data, host I/O on the update call, or a bundle
/// document that does not parse as its declared kind.
#[derive(Debug, Error)]
pub enum EntityError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("malformed bundle document: {0}")]
    Decode(#[from] serde_json::Error),
}
