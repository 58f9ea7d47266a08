//! File-backed host over a world export directory.
//!
//! Directory layout:
//!
//! - `world.json`: world metadata, including `schemaVersion`
//! - `actors.json`, `items.json`, `scenes.json`: entity arrays (a missing
//!   file is an empty collection)
//! - `packs/*.json`: compendium bundles with `label`, `kind`, `owner`,
//!   `schemaVersion`, `entities`
//!
//! Updates are transactional per entity: the patched copy replaces the
//! in-memory entry and the whole collection file is rewritten before the
//! call returns. Bundle files are re-read on every operation; the file is
//! the bundle's state.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sprawl_core::document::{Actor, EntityKind, Item, JsonMap, Scene, Token};
use sprawl_core::migrator::ActorResolver;
use sprawl_core::patch::Patch;
use sprawl_core::version::SCHEMA_VERSION;

use crate::contract::{CompendiumBundle, WorldHost};
use crate::error::{HostError, HostResult};

const WORLD_FILE: &str = "world.json";
const PACKS_DIR: &str = "packs";

/// A world export directory opened as a migration host.
pub struct FsHost {
    root: PathBuf,
    state: Mutex<WorldState>,
}

struct WorldState {
    meta: JsonMap,
    actors: Vec<Actor>,
    items: Vec<Item>,
    scenes: Vec<Scene>,
}

impl FsHost {
    /// Open a world directory, loading all entity collections.
    pub async fn open(root: impl Into<PathBuf>) -> HostResult<Self> {
        let root = root.into();
        let meta = match read_json_map(&root.join(WORLD_FILE)).await {
            Ok(meta) => meta,
            Err(HostError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => JsonMap::new(),
            Err(e) => return Err(e),
        };
        let state = WorldState {
            meta,
            actors: read_collection(&root.join(collection_file(EntityKind::Actor))).await?,
            items: read_collection(&root.join(collection_file(EntityKind::Item))).await?,
            scenes: read_collection(&root.join(collection_file(EntityKind::Scene))).await?,
        };
        Ok(Self {
            root,
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WorldState> {
        self.state.lock().expect("world state lock poisoned")
    }
}

impl ActorResolver for FsHost {
    fn resolve(&self, token: &Token) -> Option<Actor> {
        let id = token.linked_actor_id()?;
        self.lock().actors.iter().find(|a| a.id == id).cloned()
    }
}

#[async_trait]
impl WorldHost for FsHost {
    async fn list_actors(&self) -> HostResult<Vec<Actor>> {
        Ok(self.lock().actors.clone())
    }

    async fn list_items(&self) -> HostResult<Vec<Item>> {
        Ok(self.lock().items.clone())
    }

    async fn list_scenes(&self) -> HostResult<Vec<Scene>> {
        Ok(self.lock().scenes.clone())
    }

    async fn apply_patch(&self, kind: EntityKind, id: &str, patch: &Patch) -> HostResult<()> {
        // Serialize inside the lock, write after releasing it; the
        // orchestrator awaits every update, so writes never interleave.
        let bytes = {
            let mut state = self.lock();
            match kind {
                EntityKind::Actor => patch_collection(&mut state.actors, id, patch, kind, |a| &a.id)?,
                EntityKind::Item => patch_collection(&mut state.items, id, patch, kind, |i| &i.id)?,
                EntityKind::Scene => patch_collection(&mut state.scenes, id, patch, kind, |s| &s.id)?,
            }
        };
        tokio::fs::write(self.root.join(collection_file(kind)), bytes).await?;
        Ok(())
    }

    async fn bundles(&self) -> HostResult<Vec<Arc<dyn CompendiumBundle>>> {
        let packs_dir = self.root.join(PACKS_DIR);
        let mut dir = match tokio::fs::read_dir(&packs_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut bundles: Vec<Arc<dyn CompendiumBundle>> = Vec::new();
        for path in paths {
            match FsBundle::open(&path).await {
                Ok(Some(bundle)) => bundles.push(Arc::new(bundle)),
                // Filtered out: not world-owned or not a migratable kind.
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable pack file");
                }
            }
        }
        Ok(bundles)
    }

    async fn notify(&self, message: &str, persistent: bool) {
        // No UI on a file host; the console trail is the notification.
        tracing::info!(persistent, "{message}");
    }

    async fn schema_version(&self) -> HostResult<Option<String>> {
        Ok(self
            .lock()
            .meta
            .get("schemaVersion")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn record_schema_version(&self, version: &str) -> HostResult<()> {
        let bytes = {
            let mut state = self.lock();
            state
                .meta
                .insert("schemaVersion".to_string(), Value::String(version.to_string()));
            serde_json::to_vec_pretty(&state.meta)?
        };
        tokio::fs::write(self.root.join(WORLD_FILE), bytes).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bundles
// ---------------------------------------------------------------------------

/// A single pack file acting as a compendium bundle.
pub struct FsBundle {
    path: PathBuf,
    label: String,
    kind: EntityKind,
}

impl FsBundle {
    /// Open a pack file. Returns `None` for packs the migration never
    /// touches: non-world owners and non-migratable kinds.
    async fn open(path: &Path) -> HostResult<Option<FsBundle>> {
        let header = read_json_map(path).await?;
        let owner = header.get("owner").and_then(Value::as_str).unwrap_or("world");
        if owner != "world" {
            return Ok(None);
        }
        let Some(kind) = header
            .get("kind")
            .and_then(Value::as_str)
            .and_then(EntityKind::from_str)
        else {
            return Ok(None);
        };
        let label = header
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or("unnamed pack")
            .to_string();
        Ok(Some(FsBundle {
            path: path.to_path_buf(),
            label,
            kind,
        }))
    }
}

#[async_trait]
impl CompendiumBundle for FsBundle {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn migrate_schema(&self) -> HostResult<()> {
        let mut pack = read_json_map(&self.path).await?;
        pack.insert(
            "schemaVersion".to_string(),
            Value::String(SCHEMA_VERSION.to_string()),
        );
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&pack)?).await?;
        Ok(())
    }

    async fn load(&self) -> HostResult<Vec<Value>> {
        let pack = read_json_map(&self.path).await?;
        let entities = pack
            .get("entities")
            .and_then(Value::as_array)
            .ok_or_else(|| HostError::corrupt(self.path.display().to_string(), "no entities array"))?;
        Ok(entities.clone())
    }

    async fn apply_patch(&self, update: JsonMap) -> HostResult<()> {
        let (id, patch) = Patch::from_update_doc(&update)?;
        let mut pack = read_json_map(&self.path).await?;
        let entities = pack
            .get_mut("entities")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| HostError::corrupt(self.path.display().to_string(), "no entities array"))?;
        let entity = entities
            .iter_mut()
            .find(|e| e.get("_id").and_then(Value::as_str) == Some(id.as_str()))
            .ok_or_else(|| HostError::NotFound {
                kind: self.kind.as_str(),
                id: id.clone(),
            })?;
        *entity = patch.apply_to_value(entity);
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&pack)?).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn collection_file(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Actor => "actors.json",
        EntityKind::Item => "items.json",
        EntityKind::Scene => "scenes.json",
    }
}

async fn read_json_map(path: &Path) -> HostResult<JsonMap> {
    let bytes = tokio::fs::read(path).await?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| HostError::corrupt(path.display().to_string(), e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(HostError::corrupt(
            path.display().to_string(),
            "expected a JSON object",
        )),
    }
}

/// Read an entity collection file; a missing file is an empty collection.
async fn read_collection<T: DeserializeOwned>(path: &Path) -> HostResult<Vec<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| HostError::corrupt(path.display().to_string(), e.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Patch one entity in place and serialize the whole collection.
fn patch_collection<T>(
    entries: &mut [T],
    id: &str,
    patch: &Patch,
    kind: EntityKind,
    entity_id: fn(&T) -> &str,
) -> HostResult<Vec<u8>>
where
    T: Serialize + DeserializeOwned,
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
    Ok(serde_json::to_vec_pretty(&entries)?)
}
