//! Skill specialization splitting.
//!
//! Legacy skill entries stored `specs` as a single delimiter-separated
//! string; the current schema stores an array of trimmed, non-empty
//! tokens. The rule visits six fixed skill groups on every actor that
//! carries a `skills` object and rebuilds a whole group whenever any of
//! its entries still has the string shape, because the host's nested
//! update semantics replace groups wholesale. Idempotence is per skill key:
//! entries already in array form pass through untouched, and a fully
//! migrated group contributes no patch entry at all.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::document::JsonMap;
use crate::error::{CoreError, CoreResult};
use crate::patch::Patch;
use crate::rules::ActorRule;

/// Delimiters a legacy specs string may use, split on runs.
static SPEC_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,/|.]+").expect("valid regex"));

/// Skill groups visited on every actor, as dotted paths under `skills`.
pub const SKILL_GROUP_PATHS: &'static [&'static str] = &[
    "active",
    "knowledge.street",
    "knowledge.professional",
    "knowledge.academic",
    "knowledge.interests",
    "language",
];

/// Split a legacy specs string into trimmed, non-empty tokens.
pub fn split_specs(raw: &str) -> Vec<String> {
    SPEC_DELIMITERS
        .split(raw)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct SkillSpecsRule;

impl ActorRule for SkillSpecsRule {
    fn name(&self) -> &'static str {
        "skill-specs-split"
    }

    fn apply(&self, data: &JsonMap) -> CoreResult<Patch> {
        let mut patch = Patch::new();

        // A data bag with no skills object at all is a minimal or partial
        // actor (e.g. a token override); nothing to migrate. Once `skills`
        // exists, every group is required and malformed entries fail loudly.
        let Some(skills) = data.get("skills") else {
            return Ok(patch);
        };
        let skills = skills
            .as_object()
            .ok_or_else(|| CoreError::unexpected_shape("data.skills", "expected an object"))?;

        for group_path in SKILL_GROUP_PATHS {
            let full_path = format!("data.skills.{group_path}");
            let group = lookup(skills, group_path).ok_or_else(|| {
                CoreError::unexpected_shape(&full_path, "skill group is missing")
            })?;
            let group = group
                .as_object()
                .ok_or_else(|| CoreError::unexpected_shape(&full_path, "expected an object"))?;

            if let Some(rebuilt) = migrate_group(group, &full_path)? {
                patch.set(&full_path, Value::Object(rebuilt))?;
            }
        }
        Ok(patch)
    }
}

/// Rebuild one skill group, preserving key set and order. Returns `None`
/// when every entry is already in array form.
fn migrate_group(group: &JsonMap, group_path: &str) -> CoreResult<Option<JsonMap>> {
    let mut rebuilt = JsonMap::new();
    let mut changed = false;

    for (key, entry) in group {
        let entry_path = format!("{group_path}.{key}");
        let fields = entry
            .as_object()
            .ok_or_else(|| CoreError::unexpected_shape(&entry_path, "expected an object"))?;
        match fields.get("specs") {
            Some(Value::Array(_)) => {
                rebuilt.insert(key.clone(), entry.clone());
            }
            Some(Value::String(raw)) => {
                let mut fields = fields.clone();
                fields.insert(
                    "specs".to_string(),
                    Value::Array(split_specs(raw).into_iter().map(Value::String).collect()),
                );
                rebuilt.insert(key.clone(), Value::Object(fields));
                changed = true;
            }
            Some(_) => {
                return Err(CoreError::unexpected_shape(
                    format!("{entry_path}.specs"),
                    "expected a string or an array",
                ));
            }
            None => {
                return Err(CoreError::unexpected_shape(
                    format!("{entry_path}.specs"),
                    "specs field is missing",
                ));
            }
        }
    }

    Ok(changed.then_some(rebuilt))
}

/// Resolve a dotted sub-path inside an object.
fn lookup<'a>(root: &'a JsonMap, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for seg in segments {
        current = current.get(seg)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn data(value: Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    /// A full skills object where every group is empty except `active`.
    fn skills_with_active(active: Value) -> JsonMap {
        data(json!({
            "skills": {
                "active": active,
                "knowledge": {
                    "street": {},
                    "professional": {},
                    "academic": {},
                    "interests": {}
                },
                "language": {}
            }
        }))
    }

    // -- split_specs ----------------------------------------------------------

    #[test]
    fn splits_on_comma_and_slash() {
        assert_eq!(
            split_specs("Pistols, Pistols/Light"),
            vec!["Pistols", "Pistols", "Light"]
        );
    }

    #[test]
    fn splits_on_pipe_and_dot() {
        assert_eq!(split_specs("Revolvers|Snub.Nose"), vec!["Revolvers", "Snub", "Nose"]);
    }

    #[test]
    fn runs_of_delimiters_collapse() {
        assert_eq!(split_specs("a,,//b"), vec!["a", "b"]);
    }

    #[test]
    fn empty_string_splits_to_empty() {
        assert!(split_specs("").is_empty());
    }

    #[test]
    fn whitespace_only_tokens_are_dropped() {
        assert!(split_specs(" , / ").is_empty());
    }

    // -- rule -----------------------------------------------------------------

    #[test]
    fn legacy_string_specs_are_split() {
        let bag = skills_with_active(json!({
            "pistols": { "rating": 4, "specs": "Pistols, Pistols/Light" }
        }));
        let patch = SkillSpecsRule.apply(&bag).unwrap();
        assert_eq!(patch.len(), 1);
        let (path, group) = patch.entries().next().unwrap();
        assert_eq!(path, "data.skills.active");
        assert_eq!(
            group["pistols"]["specs"],
            json!(["Pistols", "Pistols", "Light"])
        );
        // Sibling fields of the entry survive the rebuild.
        assert_eq!(group["pistols"]["rating"], json!(4));
    }

    #[test]
    fn array_specs_produce_no_patch() {
        let bag = skills_with_active(json!({
            "pistols": { "specs": ["already", "array"] }
        }));
        assert!(SkillSpecsRule.apply(&bag).unwrap().is_empty());
    }

    #[test]
    fn idempotence_is_per_key_not_per_group() {
        let bag = skills_with_active(json!({
            "pistols": { "specs": ["done"] },
            "automatics": { "specs": "Assault Rifles" }
        }));
        let patch = SkillSpecsRule.apply(&bag).unwrap();
        let (_, group) = patch.entries().next().unwrap();
        // The already-migrated key passes through untouched.
        assert_eq!(group["pistols"]["specs"], json!(["done"]));
        assert_eq!(group["automatics"]["specs"], json!(["Assault Rifles"]));
    }

    #[test]
    fn group_key_order_is_preserved() {
        let bag = skills_with_active(json!({
            "zebra": { "specs": "z" },
            "alpha": { "specs": "a" }
        }));
        let patch = SkillSpecsRule.apply(&bag).unwrap();
        let (_, group) = patch.entries().next().unwrap();
        let keys: Vec<&String> = group.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zebra", "alpha"]);
    }

    #[test]
    fn nested_knowledge_group_is_visited() {
        let mut bag = skills_with_active(json!({}));
        bag["skills"]["knowledge"]["street"] =
            json!({ "gangs": { "specs": "Halloweeners,Ancients" } });
        let patch = SkillSpecsRule.apply(&bag).unwrap();
        let (path, group) = patch.entries().next().unwrap();
        assert_eq!(path, "data.skills.knowledge.street");
        assert_eq!(group["gangs"]["specs"], json!(["Halloweeners", "Ancients"]));
    }

    #[test]
    fn missing_skills_object_is_a_no_op() {
        let bag = data(json!({ "track": {} }));
        assert!(SkillSpecsRule.apply(&bag).unwrap().is_empty());
    }

    #[test]
    fn missing_group_fails_loudly() {
        let bag = data(json!({ "skills": { "active": {} } }));
        assert_matches!(
            SkillSpecsRule.apply(&bag),
            Err(CoreError::UnexpectedShape { .. })
        );
    }

    #[test]
    fn missing_specs_field_fails_loudly() {
        let bag = skills_with_active(json!({ "pistols": { "rating": 4 } }));
        let err = SkillSpecsRule.apply(&bag).unwrap_err();
        assert!(err.to_string().contains("data.skills.active.pistols.specs"));
    }

    #[test]
    fn numeric_specs_fails_loudly() {
        let bag = skills_with_active(json!({ "pistols": { "specs": 3 } }));
        assert_matches!(
            SkillSpecsRule.apply(&bag),
            Err(CoreError::UnexpectedShape { .. })
        );
    }
}
