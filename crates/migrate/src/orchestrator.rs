//! The migration orchestrator.
//!
//! Four phases, strictly sequential, each independently fault-isolated:
//! world actors, world items, world scenes, then compendium bundles. One
//! entity is processed at a time with its update awaited before the next,
//! which bounds host-side write concurrency and keeps every failure
//! attributable to a single named entity. A failed entity is logged,
//! recorded in the report, and skipped; the batch only aborts when an
//! entity-listing call itself fails.

use serde_json::Value;
use sprawl_core::document::{Actor, EntityKind, Item, Scene};
use sprawl_core::migrator::{migrate_actor, migrate_item, migrate_scene};
use sprawl_core::patch::Patch;
use sprawl_core::version::SCHEMA_VERSION;
use sprawl_host::contract::{CompendiumBundle, WorldHost};

use crate::error::{EntityError, MigrateError};
use crate::report::{MigrationFailure, MigrationReport, PhaseStats};

/// Knobs for one migration run.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// The schema version recorded after a successful run.
    pub target_version: String,
    /// Compute and log patches without applying or recording anything.
    pub dry_run: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            target_version: SCHEMA_VERSION.to_string(),
            dry_run: false,
        }
    }
}

/// Drives a full migration over one host.
pub struct Migrator<'a, H: WorldHost> {
    host: &'a H,
    options: MigrationOptions,
}

impl<'a, H: WorldHost> Migrator<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self::with_options(host, MigrationOptions::default())
    }

    pub fn with_options(host: &'a H, options: MigrationOptions) -> Self {
        Self { host, options }
    }

    /// Run all four phases and return the aggregated report.
    pub async fn run(&self) -> Result<MigrationReport, MigrateError> {
        let version = self.options.target_version.clone();
        tracing::info!(version = %version, dry_run = self.options.dry_run, "starting schema migration");
        self.host
            .notify(
                &format!("Applying schema migration to version {version}. Please be patient."),
                false,
            )
            .await;

        let mut report = MigrationReport::new(&version, self.options.dry_run);
        self.migrate_world_actors(&mut report).await?;
        self.migrate_world_items(&mut report).await?;
        self.migrate_world_scenes(&mut report).await?;
        self.migrate_bundles(&mut report).await?;

        if !self.options.dry_run {
            self.host.record_schema_version(&version).await?;
        }
        self.host
            .notify(&format!("Schema migration to version {version} completed!"), true)
            .await;
        tracing::info!(
            examined = report.total_examined(),
            migrated = report.total_migrated(),
            failed = report.failures.len(),
            "schema migration finished"
        );
        Ok(report)
    }

    // -- World phases -------------------------------------------------------

    async fn migrate_world_actors(&self, report: &mut MigrationReport) -> Result<(), MigrateError> {
        let actors = self.host.list_actors().await?;
        tracing::info!(count = actors.len(), "migrating world actors");
        for actor in &actors {
            let patch = migrate_actor(actor).map_err(EntityError::from);
            self.finish_world_entity(
                EntityKind::Actor,
                &actor.id,
                &actor.name,
                patch,
                &mut report.actors,
                &mut report.failures,
            )
            .await;
        }
        Ok(())
    }

    async fn migrate_world_items(&self, report: &mut MigrationReport) -> Result<(), MigrateError> {
        let items = self.host.list_items().await?;
        tracing::info!(count = items.len(), "migrating world items");
        for item in &items {
            let patch = migrate_item(item).map_err(EntityError::from);
            self.finish_world_entity(
                EntityKind::Item,
                &item.id,
                &item.name,
                patch,
                &mut report.items,
                &mut report.failures,
            )
            .await;
        }
        Ok(())
    }

    async fn migrate_world_scenes(&self, report: &mut MigrationReport) -> Result<(), MigrateError> {
        let scenes = self.host.list_scenes().await?;
        tracing::info!(count = scenes.len(), "migrating world scenes");
        for scene in &scenes {
            let patch = migrate_scene(scene, self.host).map_err(EntityError::from);
            self.finish_world_entity(
                EntityKind::Scene,
                &scene.id,
                &scene.name,
                patch,
                &mut report.scenes,
                &mut report.failures,
            )
            .await;
        }
        Ok(())
    }

    /// Apply one world entity's computed patch, keeping score.
    async fn finish_world_entity(
        &self,
        kind: EntityKind,
        id: &str,
        name: &str,
        patch: Result<Patch, EntityError>,
        stats: &mut PhaseStats,
        failures: &mut Vec<MigrationFailure>,
    ) {
        stats.examined += 1;
        let patch = match patch {
            Ok(patch) if patch.is_empty() => {
                stats.unchanged += 1;
                return;
            }
            Ok(patch) => patch,
            Err(e) => {
                record_failure(stats, failures, kind, None, id, name, &e);
                return;
            }
        };

        tracing::info!(kind = %kind, entity = name, id, fields = patch.len(), "migrating entity");
        if self.options.dry_run {
            stats.migrated += 1;
            return;
        }
        match self.host.apply_patch(kind, id, &patch).await {
            Ok(()) => stats.migrated += 1,
            Err(e) => record_failure(stats, failures, kind, None, id, name, &EntityError::Host(e)),
        }
    }

    // -- Bundle phase --------------------------------------------------------

    async fn migrate_bundles(&self, report: &mut MigrationReport) -> Result<(), MigrateError> {
        let bundles = self.host.bundles().await?;
        tracing::info!(count = bundles.len(), "migrating compendium bundles");
        for bundle in &bundles {
            if let Err(e) = self.migrate_bundle(bundle.as_ref(), report).await {
                tracing::error!(
                    bundle = bundle.label(),
                    error = %e,
                    "bundle migration failed; continuing"
                );
                report.bundles.failed += 1;
                report.failures.push(MigrationFailure {
                    kind: bundle.kind(),
                    bundle: Some(bundle.label().to_string()),
                    id: String::new(),
                    name: bundle.label().to_string(),
                    error: e.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn migrate_bundle(
        &self,
        bundle: &dyn CompendiumBundle,
        report: &mut MigrationReport,
    ) -> Result<(), sprawl_host::HostError> {
        tracing::info!(bundle = bundle.label(), kind = %bundle.kind(), "migrating compendium bundle");
        if !self.options.dry_run {
            bundle.migrate_schema().await?;
        }
        let documents = bundle.load().await?;

        for document in &documents {
            report.bundles.examined += 1;
            match self.migrate_bundle_document(bundle.kind(), document) {
                Ok((_, _, patch)) if patch.is_empty() => report.bundles.unchanged += 1,
                Ok((id, name, patch)) => {
                    tracing::info!(
                        kind = %bundle.kind(),
                        bundle = bundle.label(),
                        entity = %name,
                        id = %id,
                        fields = patch.len(),
                        "migrating bundle entity"
                    );
                    if self.options.dry_run {
                        report.bundles.migrated += 1;
                        continue;
                    }
                    match bundle.apply_patch(patch.to_update_doc(&id)).await {
                        Ok(()) => report.bundles.migrated += 1,
                        Err(e) => record_failure(
                            &mut report.bundles,
                            &mut report.failures,
                            bundle.kind(),
                            Some(bundle.label()),
                            &id,
                            &name,
                            &EntityError::Host(e),
                        ),
                    }
                }
                Err(e) => {
                    let id = document.get("_id").and_then(Value::as_str).unwrap_or("");
                    let name = document.get("name").and_then(Value::as_str).unwrap_or("unknown");
                    record_failure(
                        &mut report.bundles,
                        &mut report.failures,
                        bundle.kind(),
                        Some(bundle.label()),
                        id,
                        name,
                        &e,
                    );
                }
            }
        }
        Ok(())
    }

    /// Parse a raw bundle document as its declared kind and compute its
    /// patch. Token references in bundle scenes resolve against the world.
    fn migrate_bundle_document(
        &self,
        kind: EntityKind,
        document: &Value,
    ) -> Result<(String, String, Patch), EntityError> {
        match kind {
            EntityKind::Actor => {
                let actor: Actor = serde_json::from_value(document.clone())?;
                let patch = migrate_actor(&actor)?;
                Ok((actor.id, actor.name, patch))
            }
            EntityKind::Item => {
                let item: Item = serde_json::from_value(document.clone())?;
                let patch = migrate_item(&item)?;
                Ok((item.id, item.name, patch))
            }
            EntityKind::Scene => {
                let scene: Scene = serde_json::from_value(document.clone())?;
                let patch = migrate_scene(&scene, self.host)?;
                Ok((scene.id, scene.name, patch))
            }
        }
    }
}

/// Log one failed entity and keep score; the batch continues.
fn record_failure(
    stats: &mut PhaseStats,
    failures: &mut Vec<MigrationFailure>,
    kind: EntityKind,
    bundle: Option<&str>,
    id: &str,
    name: &str,
    error: &EntityError,
) {
    tracing::error!(
        kind = %kind,
        entity = name,
        id,
        bundle = bundle.unwrap_or("world"),
        error = %error,
        "entity migration failed; continuing"
    );
    stats.failed += 1;
    failures.push(MigrationFailure {
        kind,
        bundle: bundle.map(str::to_string),
        id: id.to_string(),
        name: name.to_string(),
        error: error.to_string(),
    });
}
