//! Per-kind entity migrators.
//!
//! Migrators run the applicable field transform rules against one entity,
//! merge the resulting patches, and recurse into nested entities: an actor
//! owns items inline, a scene embeds partial-actor overrides on its
//! tokens. Patches bubble up: a changed nested entity is reconstructed by
//! applying its patch to a deep copy, and the parent patch replaces the
//! whole nested sequence, because that is the host's update semantics for
//! these collections.
//!
//! Everything here is synchronous and side-effect free; migrators never
//! mutate their inputs.

use serde_json::Value;

use crate::document::{Actor, Item, JsonMap, Scene, Token};
use crate::error::{CoreError, CoreResult};
use crate::patch::Patch;
use crate::rules::{default_actor_rules, default_item_rules, ActorRule, ItemRule};

/// Resolves a token's backing actor. Implemented by hosts; resolution is
/// synchronous because hosts keep the world's actor list at hand.
pub trait ActorResolver {
    fn resolve(&self, token: &Token) -> Option<Actor>;
}

// ---------------------------------------------------------------------------
// Item migrator
// ---------------------------------------------------------------------------

/// Run the stock item rules against one item.
pub fn migrate_item(item: &Item) -> CoreResult<Patch> {
    migrate_item_with(item, &default_item_rules())
}

/// Run a caller-supplied rule set against one item.
pub fn migrate_item_with(item: &Item, rules: &[Box<dyn ItemRule>]) -> CoreResult<Patch> {
    let mut patch = Patch::new();
    for rule in rules {
        patch.merge(rule.apply(item)?)?;
    }
    Ok(patch)
}

// ---------------------------------------------------------------------------
// Actor migrator
// ---------------------------------------------------------------------------

/// Run the stock actor rules against a full actor, owned items included.
pub fn migrate_actor(actor: &Actor) -> CoreResult<Patch> {
    let mut patch = migrate_actor_data(&actor.data)?;
    if let Some(rebuilt) = migrate_owned_items(&actor.items)? {
        patch.set("items", Value::Array(rebuilt))?;
    }
    Ok(patch)
}

/// Run the stock actor rules against a bare actor `data` bag.
pub fn migrate_actor_data(data: &JsonMap) -> CoreResult<Patch> {
    migrate_actor_data_with(data, &default_actor_rules())
}

/// Run a caller-supplied rule set against a bare actor `data` bag.
pub fn migrate_actor_data_with(
    data: &JsonMap,
    rules: &[Box<dyn ActorRule>],
) -> CoreResult<Patch> {
    let mut patch = Patch::new();
    for rule in rules {
        patch.merge(rule.apply(data)?)?;
    }
    Ok(patch)
}

/// Migrate a token's `actorData` bag, treating it as a partial actor:
/// `data` and `items` are each optional and migrated only if present.
pub fn migrate_actor_override(bag: &JsonMap) -> CoreResult<Patch> {
    let mut patch = Patch::new();

    if let Some(data) = bag.get("data") {
        let data = data
            .as_object()
            .ok_or_else(|| CoreError::unexpected_shape("actorData.data", "expected an object"))?;
        patch.merge(migrate_actor_data(data)?)?;
    }

    if let Some(items) = bag.get("items") {
        let items: Vec<Item> = serde_json::from_value(items.clone()).map_err(|_| {
            CoreError::unexpected_shape("actorData.items", "expected an array of items")
        })?;
        if let Some(rebuilt) = migrate_owned_items(&items)? {
            patch.set("items", Value::Array(rebuilt))?;
        }
    }

    Ok(patch)
}

/// Migrate each owned item and reconstruct the full sequence. Returns
/// `None` when no item changed; otherwise every item is present, in
/// order, with unchanged items passed through as-is.
fn migrate_owned_items(items: &[Item]) -> CoreResult<Option<Vec<Value>>> {
    let mut rebuilt = Vec::with_capacity(items.len());
    let mut changed = false;
    for item in items {
        let patch = migrate_item(item)?;
        let value = serde_json::to_value(item)?;
        if patch.is_empty() {
            rebuilt.push(value);
        } else {
            rebuilt.push(patch.apply_to_value(&value));
            changed = true;
        }
    }
    Ok(changed.then_some(rebuilt))
}

// ---------------------------------------------------------------------------
// Scene migrator
// ---------------------------------------------------------------------------

/// Migrate a scene's token placements.
///
/// Per token, one of three terminal actions in a single pass:
/// - unlinked, actor-linked, or override-free tokens get their override
///   cleared to an empty object;
/// - a token whose backing actor cannot be resolved loses both its actor
///   reference and its override;
/// - everything else has its override migrated as a partial actor.
///
/// The returned patch replaces the whole token sequence, and only when at
/// least one token actually changed, so a second run is an empty patch.
pub fn migrate_scene(scene: &Scene, resolver: &dyn ActorResolver) -> CoreResult<Patch> {
    let mut patch = Patch::new();
    let mut rebuilt = Vec::with_capacity(scene.tokens.len());
    let mut changed = false;

    for token in &scene.tokens {
        let migrated = migrate_token(token, resolver)?;
        if migrated != *token {
            changed = true;
        }
        rebuilt.push(migrated);
    }

    if changed {
        let tokens = rebuilt
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()?;
        patch.set("tokens", Value::Array(tokens))?;
    }
    Ok(patch)
}

fn migrate_token(token: &Token, resolver: &dyn ActorResolver) -> CoreResult<Token> {
    let mut out = token.clone();

    // Inert override: nothing to migrate, normalize to an empty object.
    if token.linked_actor_id().is_none() || token.actor_link || !token.has_override() {
        out.actor_data = JsonMap::new();
        return Ok(out);
    }

    // Stale reference: drop it together with the orphaned override.
    if resolver.resolve(token).is_none() {
        out.actor_id = None;
        out.actor_data = JsonMap::new();
        return Ok(out);
    }

    let patch = migrate_actor_override(&token.actor_data)?;
    if !patch.is_empty() {
        out.actor_data = patch.apply_to(&token.actor_data);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- Helpers --------------------------------------------------------------

    fn item(id: &str, item_type: &str, data: Value) -> Item {
        serde_json::from_value(json!({
            "_id": id,
            "name": format!("item {id}"),
            "type": item_type,
            "data": data
        }))
        .unwrap()
    }

    fn full_skills() -> Value {
        json!({
            "active": {},
            "knowledge": {
                "street": {},
                "professional": {},
                "academic": {},
                "interests": {}
            },
            "language": {}
        })
    }

    fn actor(id: &str, data: Value, items: Vec<Item>) -> Actor {
        Actor {
            id: id.to_string(),
            name: format!("actor {id}"),
            data: data.as_object().cloned().unwrap(),
            items,
            extra: JsonMap::new(),
        }
    }

    fn token(value: Value) -> Token {
        serde_json::from_value(value).unwrap()
    }

    /// Resolver backed by a fixed actor list.
    struct FixedResolver(Vec<Actor>);

    impl ActorResolver for FixedResolver {
        fn resolve(&self, token: &Token) -> Option<Actor> {
            let id = token.linked_actor_id()?;
            self.0.iter().find(|a| a.id == id).cloned()
        }
    }

    fn reapply_item(item: &Item, patch: &Patch) -> Item {
        let value = patch.apply_to_value(&serde_json::to_value(item).unwrap());
        serde_json::from_value(value).unwrap()
    }

    fn reapply_actor(actor: &Actor, patch: &Patch) -> Actor {
        let value = patch.apply_to_value(&serde_json::to_value(actor).unwrap());
        serde_json::from_value(value).unwrap()
    }

    // -- Item migrator --------------------------------------------------------

    #[test]
    fn stale_cyberware_gets_action_and_capacity() {
        let stale = item("i1", "cyberware", json!({ "essence": 1 }));
        let patch = migrate_item(&stale).unwrap();
        let paths: Vec<&str> = patch.entries().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["data.action", "data.capacity"]);
    }

    #[test]
    fn item_migration_is_idempotent() {
        let stale = item("i1", "cyberware", json!({}));
        let patch = migrate_item(&stale).unwrap();
        let migrated = reapply_item(&stale, &patch);
        assert!(migrate_item(&migrated).unwrap().is_empty());
    }

    // -- Actor migrator -------------------------------------------------------

    #[test]
    fn actor_rules_merge_into_one_patch() {
        let subject = actor(
            "a1",
            json!({
                "track": { "physical": { "overflow": 0 } },
                "skills": full_skills()
            }),
            vec![],
        );
        let patch = migrate_actor(&subject).unwrap();
        assert_eq!(patch.len(), 2); // overflow value + max
    }

    #[test]
    fn owned_items_sequence_is_replaced_whole() {
        let stale = item("i1", "quality", json!({}));
        let fine = item("i2", "weapon", json!({ "ammo": 30 }));
        let subject = actor("a1", json!({}), vec![stale, fine.clone()]);

        let patch = migrate_actor(&subject).unwrap();
        let (path, items) = patch.entries().next().unwrap();
        assert_eq!(path, "items");

        let items = items.as_array().unwrap();
        assert_eq!(items.len(), 2);
        // Stale item changed in place, order preserved.
        assert!(items[0].get("data").and_then(|d| d.get("action")).is_some());
        // Unchanged item passes through as-is.
        assert_eq!(items[1], serde_json::to_value(&fine).unwrap());
    }

    #[test]
    fn actor_with_clean_items_emits_no_items_entry() {
        let fine = item("i1", "weapon", json!({}));
        let subject = actor("a1", json!({}), vec![fine]);
        assert!(migrate_actor(&subject).unwrap().is_empty());
    }

    #[test]
    fn actor_migration_is_idempotent() {
        let subject = actor(
            "a1",
            json!({
                "track": { "physical": { "overflow": 0 } },
                "skills": {
                    "active": { "pistols": { "specs": "Pistols, Pistols/Light" } },
                    "knowledge": {
                        "street": {},
                        "professional": {},
                        "academic": {},
                        "interests": {}
                    },
                    "language": {}
                }
            }),
            vec![item("i1", "cyberware", json!({}))],
        );
        let patch = migrate_actor(&subject).unwrap();
        assert!(!patch.is_empty());
        let migrated = reapply_actor(&subject, &patch);
        assert!(migrate_actor(&migrated).unwrap().is_empty());
    }

    #[test]
    fn malformed_skills_fail_the_actor() {
        let subject = actor(
            "a1",
            json!({ "skills": { "active": { "pistols": { "specs": 3 } } } }),
            vec![],
        );
        assert!(migrate_actor(&subject).is_err());
    }

    // -- Actor-override migrator ----------------------------------------------

    #[test]
    fn override_data_is_migrated_as_partial_actor() {
        let bag = json!({ "data": { "track": { "physical": { "overflow": 0 } } } });
        let patch = migrate_actor_override(bag.as_object().unwrap()).unwrap();
        assert_eq!(patch.len(), 2);
    }

    #[test]
    fn override_without_skills_is_tolerated() {
        let bag = json!({ "data": { "attributes": { "body": 4 } } });
        let patch = migrate_actor_override(bag.as_object().unwrap()).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn override_items_are_migrated() {
        let bag = json!({ "items": [ { "_id": "i1", "type": "cyberware", "data": {} } ] });
        let patch = migrate_actor_override(bag.as_object().unwrap()).unwrap();
        let (path, items) = patch.entries().next().unwrap();
        assert_eq!(path, "items");
        assert_eq!(items[0]["data"]["capacity"], json!(0));
    }

    #[test]
    fn empty_override_produces_no_patch() {
        assert!(migrate_actor_override(&JsonMap::new()).unwrap().is_empty());
    }

    // -- Scene migrator -------------------------------------------------------

    #[test]
    fn linked_token_override_is_forced_empty() {
        let scene = Scene {
            id: "s1".to_string(),
            name: "warehouse".to_string(),
            tokens: vec![token(json!({
                "name": "grunt",
                "actorId": "a1",
                "actorLink": true,
                "actorData": { "data": { "attributes": {} } }
            }))],
            extra: JsonMap::new(),
        };
        let resolver = FixedResolver(vec![actor("a1", json!({}), vec![])]);
        let patch = migrate_scene(&scene, &resolver).unwrap();
        let (path, tokens) = patch.entries().next().unwrap();
        assert_eq!(path, "tokens");
        assert_eq!(tokens[0]["actorData"], json!({}));
    }

    #[test]
    fn unresolvable_token_loses_reference_and_override() {
        let scene = Scene {
            id: "s1".to_string(),
            name: "warehouse".to_string(),
            tokens: vec![token(json!({
                "name": "ghost",
                "actorId": "gone",
                "actorData": { "data": {} }
            }))],
            extra: JsonMap::new(),
        };
        let patch = migrate_scene(&scene, &FixedResolver(vec![])).unwrap();
        let (_, tokens) = patch.entries().next().unwrap();
        assert_eq!(tokens[0]["actorId"], json!(null));
        assert_eq!(tokens[0]["actorData"], json!({}));
    }

    #[test]
    fn resolvable_override_is_migrated_in_place() {
        let scene = Scene {
            id: "s1".to_string(),
            name: "warehouse".to_string(),
            tokens: vec![token(json!({
                "name": "grunt",
                "actorId": "a1",
                "actorData": {
                    "data": { "track": { "physical": { "overflow": 0 } } }
                }
            }))],
            extra: JsonMap::new(),
        };
        let resolver = FixedResolver(vec![actor("a1", json!({}), vec![])]);
        let patch = migrate_scene(&scene, &resolver).unwrap();
        let (_, tokens) = patch.entries().next().unwrap();
        assert_eq!(
            tokens[0]["actorData"]["data"]["track"]["physical"]["overflow"],
            json!({ "value": 0, "max": 0 })
        );
        // Untouched token envelope fields ride along.
        assert_eq!(tokens[0]["actorId"], json!("a1"));
    }

    #[test]
    fn clean_scene_produces_empty_patch() {
        let scene = Scene {
            id: "s1".to_string(),
            name: "warehouse".to_string(),
            tokens: vec![token(json!({
                "name": "grunt",
                "actorId": "a1",
                "actorLink": true,
                "actorData": {}
            }))],
            extra: JsonMap::new(),
        };
        let resolver = FixedResolver(vec![actor("a1", json!({}), vec![])]);
        assert!(migrate_scene(&scene, &resolver).unwrap().is_empty());
    }

    #[test]
    fn scene_migration_is_idempotent() {
        let scene = Scene {
            id: "s1".to_string(),
            name: "warehouse".to_string(),
            tokens: vec![
                token(json!({
                    "name": "grunt",
                    "actorId": "a1",
                    "actorData": { "data": { "track": { "physical": { "overflow": 0 } } } }
                })),
                token(json!({ "name": "decoration", "actorLink": true })),
            ],
            extra: JsonMap::new(),
        };
        let resolver = FixedResolver(vec![actor("a1", json!({}), vec![])]);
        let patch = migrate_scene(&scene, &resolver).unwrap();
        assert!(!patch.is_empty());

        let value = patch.apply_to_value(&serde_json::to_value(&scene).unwrap());
        let migrated: Scene = serde_json::from_value(value).unwrap();
        assert!(migrate_scene(&migrated, &resolver).unwrap().is_empty());
    }

    #[test]
    fn malformed_override_fails_the_scene() {
        let scene = Scene {
            id: "s1".to_string(),
            name: "warehouse".to_string(),
            tokens: vec![token(json!({
                "name": "grunt",
                "actorId": "a1",
                "actorData": { "data": "not an object" }
            }))],
            extra: JsonMap::new(),
        };
        let resolver = FixedResolver(vec![actor("a1", json!({}), vec![])]);
        assert!(migrate_scene(&scene, &resolver).is_err());
    }
}
