//! Action block addition for item kinds that predate the action schema.
//!
//! Qualities and cyberware written under the old schema carry no
//! `data.action` sub-document; the current sheet code expects one. The
//! rule inserts a fully-populated default block. Items of any other kind
//! are never touched, action present or not.

use serde_json::{json, Value};

use crate::document::{Item, ItemKind};
use crate::error::CoreResult;
use crate::patch::Patch;
use crate::rules::ItemRule;

/// Item kinds that receive a default action block.
pub const ACTION_DEFAULT_KINDS: &'static [ItemKind] = &[ItemKind::Quality, ItemKind::Cyberware];

/// The default action sub-document, inserted verbatim.
pub fn default_action_block() -> Value {
    json!({
        "type": "",
        "category": "",
        "attribute": "",
        "attribute2": "",
        "skill": "",
        "spec": false,
        "mod": 0,
        "limit": {
            "value": 0,
            "attribute": ""
        },
        "extended": false,
        "damage": {
            "type": "",
            "element": "",
            "value": 0,
            "ap": {
                "value": 0
            },
            "attribute": ""
        },
        "opposed": {
            "type": "",
            "attribute": "",
            "attribute2": "",
            "skill": "",
            "mod": 0,
            "description": ""
        }
    })
}

pub struct ActionBlockRule;

impl ItemRule for ActionBlockRule {
    fn name(&self) -> &'static str {
        "action-block-addition"
    }

    fn apply(&self, item: &Item) -> CoreResult<Patch> {
        let mut patch = Patch::new();
        let applies = item
            .kind()
            .is_some_and(|kind| ACTION_DEFAULT_KINDS.contains(&kind));
        if applies && item.data.get("action").is_none() {
            patch.set("data.action", default_action_block())?;
        }
        Ok(patch)
    }
}
