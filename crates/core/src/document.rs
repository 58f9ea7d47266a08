//! Entity document types for the three migratable kinds.
//!
//! Documents are typed at the envelope level (identifier, name, subtype,
//! owned collections) while the `data` bag stays a JSON object: the bag is
//! the thing being migrated, so its shape is deliberately open. Unknown
//! envelope fields survive a round trip through the flattened catch-all
//! maps, since the host's nested-collection updates replace whole lists.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON object map used for entity data bags. Key order is preserved
/// (`serde_json` is built with `preserve_order`).
pub type JsonMap = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Entity kind
// ---------------------------------------------------------------------------

/// The three migratable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Actor,
    Item,
    Scene,
}

impl EntityKind {
    /// String representation for logging and bundle headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actor => "Actor",
            Self::Item => "Item",
            Self::Scene => "Scene",
        }
    }

    /// Parse a kind string. Returns `None` for kinds the engine does not
    /// migrate (journals, tables, ...).
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Actor" => Some(Self::Actor),
            "Item" => Some(Self::Item),
            "Scene" => Some(Self::Scene),
            _ => None,
        }
    }

    /// All migratable kinds.
    pub const ALL: &'static [EntityKind] = &[Self::Actor, Self::Item, Self::Scene];
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Item subtype
// ---------------------------------------------------------------------------

/// Closed set of known item subtypes. Rule applicability is expressed as
/// membership checks against const slices of this enum, never as string
/// comparison on the raw discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Weapon,
    Armor,
    Device,
    Equipment,
    Ammo,
    Quality,
    Cyberware,
    Bioware,
    Spell,
    AdeptPower,
    ComplexForm,
    Lifestyle,
    Contact,
    Sin,
    Program,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Armor => "armor",
            Self::Device => "device",
            Self::Equipment => "equipment",
            Self::Ammo => "ammo",
            Self::Quality => "quality",
            Self::Cyberware => "cyberware",
            Self::Bioware => "bioware",
            Self::Spell => "spell",
            Self::AdeptPower => "adept_power",
            Self::ComplexForm => "complex_form",
            Self::Lifestyle => "lifestyle",
            Self::Contact => "contact",
            Self::Sin => "sin",
            Self::Program => "program",
        }
    }

    /// Parse a subtype discriminator. Unknown strings (items added by host
    /// modules) parse to `None` and match no transform rules.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "weapon" => Some(Self::Weapon),
            "armor" => Some(Self::Armor),
            "device" => Some(Self::Device),
            "equipment" => Some(Self::Equipment),
            "ammo" => Some(Self::Ammo),
            "quality" => Some(Self::Quality),
            "cyberware" => Some(Self::Cyberware),
            "bioware" => Some(Self::Bioware),
            "spell" => Some(Self::Spell),
            "adept_power" => Some(Self::AdeptPower),
            "complex_form" => Some(Self::ComplexForm),
            "lifestyle" => Some(Self::Lifestyle),
            "contact" => Some(Self::Contact),
            "sin" => Some(Self::Sin),
            "program" => Some(Self::Program),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// An item document: world-owned or embedded in an actor's owned list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Raw subtype discriminator as stored by the host.
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub data: JsonMap,
    /// Envelope fields the engine does not interpret (img, flags, ...).
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl Item {
    /// The parsed subtype, if the discriminator names a known kind.
    pub fn kind(&self) -> Option<ItemKind> {
        ItemKind::from_str(&self.item_type)
    }
}

/// An actor document with its ordered owned-item sequence inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub data: JsonMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// A scene document owning an ordered sequence of token placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// A token placement referencing an actor, optionally carrying an inline
/// partial-actor override used when the token's stats diverge from its
/// source actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "actorId", default)]
    pub actor_id: Option<String>,
    #[serde(rename = "actorLink", default)]
    pub actor_link: bool,
    /// The override bag. Always serialized: clearing an override means
    /// writing an empty object back through the whole-list replace.
    #[serde(rename = "actorData", default)]
    pub actor_data: JsonMap,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl Token {
    /// The referenced actor id. An empty string counts as no reference.
    pub fn linked_actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Whether the token carries any override data at all.
    pub fn has_override(&self) -> bool {
        !self.actor_data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- EntityKind -----------------------------------------------------------

    #[test]
    fn entity_kind_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_str(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn entity_kind_unknown_returns_none() {
        assert!(EntityKind::from_str("JournalEntry").is_none());
    }

    #[test]
    fn entity_kind_display_matches_as_str() {
        assert_eq!(format!("{}", EntityKind::Scene), "Scene");
    }

    // -- ItemKind -------------------------------------------------------------

    #[test]
    fn item_kind_round_trip() {
        let kinds = [
            ItemKind::Weapon,
            ItemKind::Quality,
            ItemKind::Cyberware,
            ItemKind::AdeptPower,
            ItemKind::ComplexForm,
        ];
        for kind in kinds {
            assert_eq!(ItemKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn item_kind_unknown_returns_none() {
        assert!(ItemKind::from_str("martial_art").is_none());
    }

    // -- Documents ------------------------------------------------------------

    #[test]
    fn item_parses_subtype() {
        let item: Item = serde_json::from_value(json!({
            "_id": "i1",
            "name": "Wired Reflexes",
            "type": "cyberware",
            "data": { "essence": 2 }
        }))
        .unwrap();
        assert_eq!(item.kind(), Some(ItemKind::Cyberware));
        assert_eq!(item.data["essence"], json!(2));
    }

    #[test]
    fn item_keeps_unknown_envelope_fields() {
        let raw = json!({
            "_id": "i1",
            "name": "Low Pain Tolerance",
            "type": "quality",
            "img": "icons/quality.png",
            "flags": { "source": "core" }
        });
        let item: Item = serde_json::from_value(raw).unwrap();
        assert_eq!(item.extra["img"], json!("icons/quality.png"));
        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["img"], json!("icons/quality.png"));
        assert_eq!(back["flags"]["source"], json!("core"));
    }

    #[test]
    fn actor_defaults_empty_collections() {
        let actor: Actor = serde_json::from_value(json!({
            "_id": "a1",
            "name": "Street Samurai"
        }))
        .unwrap();
        assert!(actor.data.is_empty());
        assert!(actor.items.is_empty());
    }

    #[test]
    fn token_empty_actor_id_counts_as_unlinked() {
        let token: Token = serde_json::from_value(json!({
            "name": "grunt",
            "actorId": ""
        }))
        .unwrap();
        assert!(token.linked_actor_id().is_none());
    }

    #[test]
    fn token_override_detection() {
        let token: Token = serde_json::from_value(json!({
            "name": "grunt",
            "actorId": "a1",
            "actorData": { "data": { "track": {} } }
        }))
        .unwrap();
        assert!(token.has_override());
        assert_eq!(token.linked_actor_id(), Some("a1"));
    }

    #[test]
    fn token_serializes_cleared_override() {
        let token = Token {
            name: "grunt".to_string(),
            actor_id: Some("a1".to_string()),
            actor_link: false,
            actor_data: JsonMap::new(),
            extra: JsonMap::new(),
        };
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["actorData"], json!({}));
    }
}
