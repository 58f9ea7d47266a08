//! Aggregated migration report.
//!
//! The host UI only sees start/completion notifications; the report is
//! the operator-facing summary of what the console trail recorded, one
//! stats block per phase plus the failure list.

use serde::Serialize;
use sprawl_core::document::EntityKind;

/// Counters for one migration phase.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PhaseStats {
    /// Entities inspected.
    pub examined: usize,
    /// Entities with a non-empty patch that was applied (or would have
    /// been, in a dry run).
    pub migrated: usize,
    /// Entities already in the current shape.
    pub unchanged: usize,
    /// Entities whose migration or update failed.
    pub failed: usize,
}

/// One failed entity, with enough context to find it again.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationFailure {
    pub kind: EntityKind,
    /// Bundle label when the entity lives in a compendium bundle.
    pub bundle: Option<String>,
    pub id: String,
    pub name: String,
    pub error: String,
}

/// Outcome of a full migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// The schema version this run migrated to.
    pub target_version: String,
    pub dry_run: bool,
    pub actors: PhaseStats,
    pub items: PhaseStats,
    pub scenes: PhaseStats,
    pub bundles: PhaseStats,
    pub failures: Vec<MigrationFailure>,
}

impl MigrationReport {
    pub fn new(target_version: &str, dry_run: bool) -> Self {
        Self {
            target_version: target_version.to_string(),
            dry_run,
            actors: PhaseStats::default(),
            items: PhaseStats::default(),
            scenes: PhaseStats::default(),
            bundles: PhaseStats::default(),
            failures: Vec::new(),
        }
    }

    pub fn total_examined(&self) -> usize {
        self.phases().iter().map(|p| p.examined).sum()
    }

    pub fn total_migrated(&self) -> usize {
        self.phases().iter().map(|p| p.migrated).sum()
    }

    /// Whether every examined entity migrated (or was already current).
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn phases(&self) -> [PhaseStats; 4] {
        [self.actors, self.items, self.scenes, self.bundles]
    }
}
