//! Capacity field addition for cyberware.
//!
//! Old-schema cyberware has no `data.capacity`; the current schema
//! defaults it to 0.

use serde_json::json;

use crate::document::{Item, ItemKind};
use crate::error::CoreResult;
use crate::patch::Patch;
use crate::rules::ItemRule;

pub struct CapacityRule;

impl ItemRule for CapacityRule {
    fn name(&self) -> &'static str {
        "capacity-addition"
    }

    fn apply(&self, item: &Item) -> CoreResult<Patch> {
        let mut patch = Patch::new();
        if item.kind() == Some(ItemKind::Cyberware) && item.data.get("capacity").is_none() {
            patch.set("data.capacity", json!(0))?;
        }
        Ok(patch)
    }
}
