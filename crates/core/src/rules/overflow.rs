//! Overflow normalization for the physical damage track.
//!
//! The legacy shape stored `track.physical.overflow` as a bare `0`; the
//! current schema expects a `{ value, max }` pair. Already-expanded
//! overflow objects are left alone, as is any shape other than the bare
//! numeric zero.

use serde_json::{json, Value};

use crate::document::JsonMap;
use crate::error::CoreResult;
use crate::patch::Patch;
use crate::rules::ActorRule;

pub struct OverflowRule;

impl ActorRule for OverflowRule {
    fn name(&self) -> &'static str {
        "overflow-normalization"
    }

    fn apply(&self, data: &JsonMap) -> CoreResult<Patch> {
        let mut patch = Patch::new();
        let overflow = data
            .get("track")
            .and_then(|track| track.get("physical"))
            .and_then(|physical| physical.get("overflow"));
        if let Some(value) = overflow {
            if is_bare_zero(value) {
                patch.set("data.track.physical.overflow.value", json!(0))?;
                patch.set("data.track.physical.overflow.max", json!(0))?;
            }
        }
        Ok(patch)
    }
}

fn is_bare_zero(value: &Value) -> bool {
    value.is_number() && value.as_f64() == Some(0.0)
}
