//! Collaborator contracts between the migration engine and its host.
//!
//! The engine reads entities and hands patches back; everything else
//! (persistence, change broadcast, UI) stays on the host's side of these
//! traits. All calls are awaited one at a time by the orchestrator, so
//! implementations never see concurrent updates.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sprawl_core::document::{Actor, EntityKind, Item, JsonMap, Scene};
use sprawl_core::migrator::ActorResolver;
use sprawl_core::patch::Patch;

use crate::error::HostResult;

/// A live world: entity listings, partial updates, bundles, user
/// notification, and the persisted schema version.
///
/// `ActorResolver` is a supertrait because scene migration resolves token
/// references against the world's actor list.
#[async_trait]
pub trait WorldHost: ActorResolver + Send + Sync {
    /// All world-scoped actors. Failure here aborts the whole batch.
    async fn list_actors(&self) -> HostResult<Vec<Actor>>;

    /// All world-scoped items.
    async fn list_items(&self) -> HostResult<Vec<Item>>;

    /// All world-scoped scenes.
    async fn list_scenes(&self) -> HostResult<Vec<Scene>>;

    /// Apply a partial update to one world entity. Permissive merge: the
    /// host must not strictly re-validate or coerce patched fields.
    async fn apply_patch(&self, kind: EntityKind, id: &str, patch: &Patch) -> HostResult<()>;

    /// World-owned compendium bundles holding migratable kinds. The
    /// owner/kind filter is the host's responsibility; bundles shipped by
    /// installed add-ons are never listed.
    async fn bundles(&self) -> HostResult<Vec<Arc<dyn CompendiumBundle>>>;

    /// Fire-and-forget user notification.
    async fn notify(&self, message: &str, persistent: bool);

    /// The schema version recorded by the last completed migration, if any.
    async fn schema_version(&self) -> HostResult<Option<String>>;

    /// Persist the schema version after a completed migration.
    async fn record_schema_version(&self, version: &str) -> HostResult<()>;
}

/// A packaged collection of entities of a single kind.
#[async_trait]
pub trait CompendiumBundle: Send + Sync {
    /// Human-readable bundle name for logs.
    fn label(&self) -> &str;

    /// The entity kind this bundle holds.
    fn kind(&self) -> EntityKind;

    /// Bundle-internal version bump; opaque to the engine.
    async fn migrate_schema(&self) -> HostResult<()>;

    /// Load the bundle's entities as raw documents. The caller parses
    /// them according to [`CompendiumBundle::kind`].
    async fn load(&self) -> HostResult<Vec<Value>>;

    /// Apply an update document to one entity. Unlike the world update
    /// contract, the target identifier travels inline as the document's
    /// `_id` field (see [`Patch::to_update_doc`]).
    async fn apply_patch(&self, update: JsonMap) -> HostResult<()>;
}
