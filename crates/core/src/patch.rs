//! Sparse dotted-path patches.
//!
//! A [`Patch`] maps validated dotted paths (e.g.
//! `data.track.physical.overflow.value`) to replacement JSON values. An
//! empty patch means "no migration needed". Rules produce disjoint paths;
//! instead of trusting that invariant, `set` and `merge` reject an entry
//! whose path equals, or is a dot-prefix of, an existing one.
//!
//! Application is immutable: [`Patch::apply_to`] returns a new object and
//! never mutates its input. The merge is permissive: missing intermediate
//! objects are created, and a non-object intermediate (such as a legacy
//! scalar that the patch expands into a value/max pair) is replaced by an
//! object so leaf writes always land.

use serde_json::Value;

use crate::document::JsonMap;
use crate::error::{CoreError, CoreResult};

/// A sparse set of field replacements describing a migration's effect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    /// Path -> value, in insertion order.
    entries: Vec<(String, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v))
    }

    /// Add a replacement at `path`.
    ///
    /// Rejects empty paths, paths with empty segments, and paths that
    /// overlap an existing entry (equal or in a dot-prefix relationship).
    pub fn set(&mut self, path: &str, value: Value) -> CoreResult<()> {
        if path.is_empty() || path.split('.').any(|seg| seg.is_empty()) {
            return Err(CoreError::InvalidPatchPath {
                path: path.to_string(),
            });
        }
        if self.entries.iter().any(|(existing, _)| overlaps(existing, path)) {
            return Err(CoreError::PatchConflict {
                path: path.to_string(),
            });
        }
        self.entries.push((path.to_string(), value));
        Ok(())
    }

    /// Fold another patch into this one under the same collision rules.
    pub fn merge(&mut self, other: Patch) -> CoreResult<()> {
        for (path, value) in other.entries {
            self.set(&path, value)?;
        }
        Ok(())
    }

    /// Apply the patch to a copy of `base`, returning the merged object.
    pub fn apply_to(&self, base: &JsonMap) -> JsonMap {
        let mut root = base.clone();
        for (path, value) in &self.entries {
            write_path(&mut root, path, value.clone());
        }
        root
    }

    /// Like [`Patch::apply_to`], for a value known to be an object. A
    /// non-object base is treated as empty, matching the permissive merge.
    pub fn apply_to_value(&self, base: &Value) -> Value {
        let root = match base {
            Value::Object(map) => map.clone(),
            _ => JsonMap::new(),
        };
        Value::Object(self.apply_to(&root))
    }

    /// Render the patch as a flat update document carrying the target
    /// entity's identifier inline, as the bundle update contract requires.
    pub fn to_update_doc(&self, id: &str) -> JsonMap {
        let mut doc = JsonMap::new();
        doc.insert("_id".to_string(), Value::String(id.to_string()));
        for (path, value) in &self.entries {
            doc.insert(path.clone(), value.clone());
        }
        doc
    }

    /// Rebuild an `(id, patch)` pair from a flat update document produced
    /// by [`Patch::to_update_doc`].
    pub fn from_update_doc(doc: &JsonMap) -> CoreResult<(String, Patch)> {
        let id = doc
            .get("_id")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::unexpected_shape("_id", "update document carries no id"))?
            .to_string();
        let mut patch = Patch::new();
        for (path, value) in doc {
            if path == "_id" {
                continue;
            }
            patch.set(path, value.clone())?;
        }
        Ok((id, patch))
    }
}

/// Whether two dotted paths collide: equal, or one nests under the other.
fn overlaps(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (shorter, longer) = if a.len() < b.len() { (a, b) } else { (b, a) };
    longer.starts_with(shorter) && longer.as_bytes()[shorter.len()] == b'.'
}

/// Write `value` at `path` inside `root`, creating intermediate objects and
/// replacing non-object intermediates.
fn write_path(root: &mut JsonMap, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut cursor = root;
    for seg in &segments[..segments.len() - 1] {
        let slot = cursor
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(JsonMap::new()));
        if !slot.is_object() {
            *slot = Value::Object(JsonMap::new());
        }
        cursor = slot.as_object_mut().expect("slot normalized to object");
    }
    cursor.insert(segments[segments.len() - 1].to_string(), value);
}
