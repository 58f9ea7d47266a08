//! In-memory host used by orchestrator tests.
//!
//! Keeps every collection behind a mutex, records applied patches and
//! notifications for assertions, and can poison individual entity ids so
//! batch-level fault isolation is testable. Updates are applied for real:
//! a second migration run over a [`MemoryHost`] sees migrated data.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use sprawl_core::document::{Actor, EntityKind, Item, JsonMap, Scene, Token};
use sprawl_core::migrator::ActorResolver;
use sprawl_core::patch::Patch;

use crate::contract::{CompendiumBundle, WorldHost};
use crate::error::{HostError, HostResult};

/// One recorded world update.
#[derive(Debug, Clone)]
pub struct AppliedPatch {
    pub kind: EntityKind,
    pub id: String,
    pub patch: Patch,
}

#[derive(Default)]
struct MemoryState {
    actors: Vec<Actor>,
    items: Vec<Item>,
    scenes: Vec<Scene>,
    version: Option<String>,
    applied: Vec<AppliedPatch>,
    poisoned: HashSet<String>,
    notices: Vec<(String, bool)>,
    fail_listing: bool,
}

/// An in-memory world host.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<MemoryState>,
    bundles: Vec<Arc<MemoryBundle>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_actor(&mut self, actor: Actor) {
        self.lock().actors.push(actor);
    }

    pub fn add_item(&mut self, item: Item) {
        self.lock().items.push(item);
    }

    pub fn add_scene(&mut self, scene: Scene) {
        self.lock().scenes.push(scene);
    }

    /// Register a bundle and return the shared handle for assertions.
    pub fn add_bundle(&mut self, bundle: MemoryBundle) -> Arc<MemoryBundle> {
        let bundle = Arc::new(bundle);
        self.bundles.push(Arc::clone(&bundle));
        bundle
    }

    /// Make every update against `id` fail with a host error.
    pub fn poison(&mut self, id: &str) {
        self.lock().poisoned.insert(id.to_string());
    }

    /// Make every entity listing fail, simulating total unavailability.
    pub fn fail_listings(&mut self) {
        self.lock().fail_listing = true;
    }

    pub fn set_version(&mut self, version: &str) {
        self.lock().version = Some(version.to_string());
    }

    /// All world updates applied so far, in order.
    pub fn applied(&self) -> Vec<AppliedPatch> {
        self.lock().applied.clone()
    }

    /// All notifications sent so far, as `(message, persistent)` pairs.
    pub fn notices(&self) -> Vec<(String, bool)> {
        self.lock().notices.clone()
    }

    pub fn recorded_version(&self) -> Option<String> {
        self.lock().version.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory host lock poisoned")
    }
}

impl ActorResolver for MemoryHost {
    fn resolve(&self, token: &Token) -> Option<Actor> {
        let id = token.linked_actor_id()?;
        self.lock().actors.iter().find(|a| a.id == id).cloned()
    }
}

#[async_trait]
impl WorldHost for MemoryHost {
    async fn list_actors(&self) -> HostResult<Vec<Actor>> {
        let state = self.lock();
        if state.fail_listing {
            return Err(HostError::Unavailable("listing service down".to_string()));
        }
        Ok(state.actors.clone())
    }

    async fn list_items(&self) -> HostResult<Vec<Item>> {
        let state = self.lock();
        if state.fail_listing {
            return Err(HostError::Unavailable("listing service down".to_string()));
        }
        Ok(state.items.clone())
    }

    async fn list_scenes(&self) -> HostResult<Vec<Scene>> {
        let state = self.lock();
        if state.fail_listing {
            return Err(HostError::Unavailable("listing service down".to_string()));
        }
        Ok(state.scenes.clone())
    }

    async fn apply_patch(&self, kind: EntityKind, id: &str, patch: &Patch) -> HostResult<()> {
        let mut state = self.lock();
        if state.poisoned.contains(id) {
            return Err(HostError::Unavailable(format!(
                "simulated update failure for {id}"
            )));
        }
        match kind {
            EntityKind::Actor => apply_to_entry(&mut state.actors, id, patch, kind, |a| &a.id)?,
            EntityKind::Item => apply_to_entry(&mut state.items, id, patch, kind, |i| &i.id)?,
            EntityKind::Scene => apply_to_entry(&mut state.scenes, id, patch, kind, |s| &s.id)?,
        }
        state.applied.push(AppliedPatch {
            kind,
            id: id.to_string(),
            patch: patch.clone(),
        });
        Ok(())
    }

    async fn bundles(&self) -> HostResult<Vec<Arc<dyn CompendiumBundle>>> {
        Ok(self
            .bundles
            .iter()
            .map(|b| Arc::clone(b) as Arc<dyn CompendiumBundle>)
            .collect())
    }

    async fn notify(&self, message: &str, persistent: bool) {
        self.lock().notices.push((message.to_string(), persistent));
    }

    async fn schema_version(&self) -> HostResult<Option<String>> {
        Ok(self.lock().version.clone())
    }

    async fn record_schema_version(&self, version: &str) -> HostResult<()> {
        self.lock().version = Some(version.to_string());
        Ok(())
    }
}

fn apply_to_entry<T>(
    entries: &mut [T],
    id: &str,
    patch: &Patch,
    kind: EntityKind,
    entity_id: fn(&T) -> &str,
) -> HostResult<()>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let pos = entries
        .iter()
        .position(|e| entity_id(e) == id)
        .ok_or_else(|| HostError::NotFound {
            kind: kind.as_str(),
            id: id.to_string(),
        })?;
    let patched = patch.apply_to_value(&serde_json::to_value(&entries[pos])?);
    entries[pos] = serde_json::from_value(patched)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Bundles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BundleState {
    entities: Vec<Value>,
    schema_migrated: bool,
    updates: Vec<JsonMap>,
    fail_load: bool,
}

/// An in-memory compendium bundle.
pub struct MemoryBundle {
    label: String,
    kind: EntityKind,
    state: Mutex<BundleState>,
}

impl MemoryBundle {
    pub fn new(label: &str, kind: EntityKind, entities: Vec<Value>) -> Self {
        Self {
            label: label.to_string(),
            kind,
            state: Mutex::new(BundleState {
                entities,
                ..BundleState::default()
            }),
        }
    }

    /// Make `load` fail, simulating an unreachable bundle.
    pub fn fail_load(&self) {
        self.lock().fail_load = true;
    }

    pub fn schema_migrated(&self) -> bool {
        self.lock().schema_migrated
    }

    /// Update documents received so far; each carries `_id` inline.
    pub fn updates(&self) -> Vec<JsonMap> {
        self.lock().updates.clone()
    }

    pub fn entities(&self) -> Vec<Value> {
        self.lock().entities.clone()
    }

    fn lock(&self) -> MutexGuard<'_, BundleState> {
        self.state.lock().expect("memory bundle lock poisoned")
    }
}

#[async_trait]
impl CompendiumBundle for MemoryBundle {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn migrate_schema(&self) -> HostResult<()> {
        self.lock().schema_migrated = true;
        Ok(())
    }

    async fn load(&self) -> HostResult<Vec<Value>> {
        let state = self.lock();
        if state.fail_load {
            return Err(HostError::Unavailable(format!(
                "simulated load failure for {}",
                self.label
            )));
        }
        Ok(state.entities.clone())
    }

    async fn apply_patch(&self, update: JsonMap) -> HostResult<()> {
        let (id, patch) = Patch::from_update_doc(&update)?;
        let mut state = self.lock();
        let entity = state
            .entities
            .iter_mut()
            .find(|e| e.get("_id").and_then(Value::as_str) == Some(id.as_str()))
            .ok_or_else(|| HostError::NotFound {
                kind: self.kind.as_str(),
                id: id.clone(),
            })?;
        *entity = patch.apply_to_value(entity);
        state.updates.push(update);
        Ok(())
    }
}
