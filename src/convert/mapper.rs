//! Builds the platform actor document from a hero record, resolving every
//! compendium reference through the [`Resolver`].

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use super::hero::Hero;
use super::level::{detect_level, LevelDetection};
use crate::compendium::item::{CanonicalItem, ItemType};
use crate::compendium::resolver::{ResolutionRequest, ResolutionResult, Resolver};
use crate::constants::{ACTOR_TYPE, FLAGS_SCOPE, PLACEHOLDER_IMG, SYSTEM_ID};
use crate::error::StrictResolutionError;

const CHARACTERISTICS: [&str; 5] = ["might", "agility", "reason", "intuition", "presence"];

/// A reference pulled from the hero record, with the text used if it misses.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub request: ResolutionRequest,
    pub description: String,
}

impl Reference {
    fn new(name: &str, item_type: ItemType, context: &str, description: &str) -> Self {
        Self {
            request: ResolutionRequest::new(name, Some(item_type), context),
            description: description.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ConversionOutcome {
    pub actor: Value,
    pub level: LevelDetection,
    pub references: usize,
    pub placeholders: usize,
}

/// Every compendium reference in the hero, in output order, without repeats.
pub fn collect_references(hero: &Hero, level: i64) -> Vec<Reference> {
    let mut refs = Vec::new();

    let elements = [
        (&hero.ancestry, ItemType::Ancestry, "ancestry"),
        (&hero.culture, ItemType::Culture, "culture"),
        (&hero.career, ItemType::Career, "career"),
    ];
    for (element, item_type, context) in elements {
        if let Some(e) = element {
            refs.push(Reference::new(&e.name, item_type, context, &e.description));
        }
    }

    if let Some(class) = &hero.class {
        refs.push(Reference::new(&class.name, ItemType::Class, "class", &class.description));
        for subclass in class.subclasses.iter().filter(|s| s.selected) {
            refs.push(Reference::new(
                &subclass.name,
                ItemType::Subclass,
                "class.subclasses",
                &subclass.description,
            ));
        }
    }

    if let Some(complication) = &hero.complication {
        refs.push(Reference::new(
            &complication.name,
            ItemType::Complication,
            "complication",
            &complication.description,
        ));
    }

    if let Some(class) = &hero.class {
        for tier in &class.features_by_level {
            let tier_level = tier
                .level
                .as_ref()
                .and_then(super::level::normalize_level)
                .unwrap_or(1);
            if tier_level > level {
                continue;
            }
            let context = format!("class.featuresByLevel[{}]", tier_level);
            for feature in &tier.features {
                for (name, item_type, description) in feature.references() {
                    refs.push(Reference::new(&name, item_type, &context, &description));
                }
            }
        }
        for ability in &class.abilities {
            if ability.min_level.is_some_and(|min| min > level) {
                continue;
            }
            refs.push(Reference::new(
                &ability.name,
                ItemType::Ability,
                "class.abilities",
                &ability.description,
            ));
        }
    }

    for item in &hero.state.inventory {
        refs.push(Reference::new(&item.name, ItemType::Treasure, "state.inventory", &item.description));
    }
    for project in &hero.state.projects {
        refs.push(Reference::new(&project.name, ItemType::Project, "state.projects", &project.description));
    }

    let mut seen = HashSet::new();
    refs.retain(|r| {
        !r.request.name.trim().is_empty()
            && seen.insert((r.request.declared_type, r.request.name.to_lowercase()))
    });
    refs
}

/// Embedded copy of a resolved item, annotated with its compendium origin.
pub fn embed_item(item: &CanonicalItem) -> Value {
    let mut doc = match &item.payload {
        Value::Object(map) => map.clone(),
        _ => {
            let mut map = Map::new();
            map.insert("name".to_string(), json!(item.name));
            map.insert("type".to_string(), json!(item.item_type.as_str()));
            map.insert("system".to_string(), json!({ "_dsid": item.id }));
            map
        }
    };
    doc.remove("_key");
    doc.remove("folder");

    if let Some(id) = doc.get("_id").and_then(Value::as_str).map(str::to_string) {
        let source = format!("Compendium.{}.{}.Item.{}", SYSTEM_ID, item.collection, id);
        let stats = doc
            .entry("_stats")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(stats) = stats {
            stats.insert("compendiumSource".to_string(), Value::String(source));
        }
    }
    Value::Object(doc)
}

/// Stable 16-character document id for a placeholder.
pub fn placeholder_id(context: &str, name: &str) -> String {
    let uuid = Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("{}/{}", context, name).as_bytes());
    uuid.simple().to_string()[..16].to_string()
}

pub fn placeholder_item(reference: &Reference) -> Value {
    let request = &reference.request;
    let item_type = request.declared_type.unwrap_or(ItemType::Feature);
    json!({
        "_id": placeholder_id(&request.context, &request.name),
        "name": request.name,
        "type": item_type.as_str(),
        "img": PLACEHOLDER_IMG,
        "system": {
            "_dsid": crate::compendium::item::slugify(&request.name),
            "description": { "value": reference.description },
        },
        "flags": {
            FLAGS_SCOPE: { "placeholder": true, "context": request.context },
        },
    })
}

fn characteristics(hero: &Hero) -> Value {
    let mut map = Map::new();
    for key in CHARACTERISTICS {
        let value = hero
            .class
            .as_ref()
            .and_then(|c| {
                c.characteristics
                    .iter()
                    .find(|cv| cv.characteristic.eq_ignore_ascii_case(key))
            })
            .map(|cv| cv.value)
            .unwrap_or(0);
        map.insert(key.to_string(), json!({ "value": value }));
    }
    Value::Object(map)
}

/// Convert `hero`, resolving references in order. In strict mode the first miss aborts.
pub fn convert_character(
    hero: &Hero,
    resolver: &mut Resolver<'_>,
) -> Result<ConversionOutcome, StrictResolutionError> {
    let level = detect_level(hero);
    let references = collect_references(hero, level.level);

    let mut items = Vec::with_capacity(references.len());
    let mut placeholders = 0;
    for reference in &references {
        match resolver.resolve(&reference.request)? {
            ResolutionResult::Resolved { item, .. } => items.push(embed_item(item)),
            ResolutionResult::NotFound { .. } => {
                placeholders += 1;
                items.push(placeholder_item(reference));
            }
        }
    }

    let state = &hero.state;
    let actor = json!({
        "name": hero.name,
        "type": ACTOR_TYPE,
        "img": PLACEHOLDER_IMG,
        "system": {
            "characteristics": characteristics(hero),
            "stamina": { "value": 0, "temporary": state.stamina_temp },
            "hero": {
                "wealth": state.wealth,
                "renown": state.renown,
                "xp": state.xp,
                "victories": state.victories,
                "recoveries": { "spent": state.recoveries_used },
                "primary": { "value": state.heroic_resource },
            },
            "biography": { "value": state.notes },
        },
        "items": items,
        "flags": {
            FLAGS_SCOPE: {
                "sourceId": hero.id,
                "level": level.level,
                "levelSource": level.source.map(|s| s.label()),
            },
        },
    });

    info!(
        hero = %hero.name,
        references = references.len(),
        placeholders,
        "character converted"
    );
    Ok(ConversionOutcome {
        actor,
        level,
        references: references.len(),
        placeholders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_id_is_stable() {
        let a = placeholder_id("state.inventory", "Test Item");
        let b = placeholder_id("state.inventory", "Test Item");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, placeholder_id("state.inventory", "Other Item"));
    }

    #[test]
    fn test_embed_item_sets_compendium_source() {
        let mut item = CanonicalItem::new("charge", "Charge", ItemType::Ability, "").with_collection("abilities");
        item.payload = json!({
            "_id": "abc123",
            "_key": "!items!abc123",
            "folder": "f1",
            "name": "Charge",
            "type": "ability",
        });
        let doc = embed_item(&item);
        assert_eq!(doc["_stats"]["compendiumSource"], "Compendium.draw-steel.abilities.Item.abc123");
        assert!(doc.get("_key").is_none());
        assert!(doc.get("folder").is_none());
    }

    #[test]
    fn test_embed_item_without_payload() {
        let item = CanonicalItem::new("grab", "Grab", ItemType::Ability, "");
        let doc = embed_item(&item);
        assert_eq!(doc["name"], "Grab");
        assert_eq!(doc["system"]["_dsid"], "grab");
        assert!(doc.get("_stats").is_none());
    }

    #[test]
    fn test_collect_references_dedupes_and_filters_by_level() {
        let hero: Hero = serde_json::from_value(json!({
            "name": "X",
            "ancestry": { "name": "Memonek" },
            "class": {
                "name": "Elementalist",
                "level": 1,
                "featuresByLevel": [
                    { "level": 1, "features": [ { "name": "Hurl Element", "type": "Text" } ] },
                    { "level": 2, "features": [ { "name": "Later Thing", "type": "Text" } ] }
                ],
                "abilities": [
                    { "name": "Hurl Element", "level": 1 },
                    { "name": "Big Boom", "minLevel": 5 }
                ]
            },
            "state": { "inventory": [ { "name": "Rope" }, { "name": "rope" } ] }
        }))
        .unwrap();

        let refs = collect_references(&hero, 1);
        let names: Vec<_> = refs
            .iter()
            .map(|r| (r.request.name.as_str(), r.request.declared_type.unwrap()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Memonek", ItemType::Ancestry),
                ("Elementalist", ItemType::Class),
                ("Hurl Element", ItemType::Feature),
                ("Hurl Element", ItemType::Ability),
                ("Rope", ItemType::Treasure),
            ]
        );
    }
}
