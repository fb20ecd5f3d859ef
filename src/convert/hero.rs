//! Lenient model of the authoring tool's hero export. Unknown fields are ignored.

use serde::Deserialize;
use serde_json::Value;

use crate::compendium::item::ItemType;
use crate::error::{ConverterError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Hero {
    pub id: String,
    pub name: String,
    pub level: Option<Value>,
    pub ancestry: Option<Element>,
    pub culture: Option<Element>,
    pub career: Option<Element>,
    pub class: Option<HeroClass>,
    pub complication: Option<Element>,
    pub state: HeroState,
}

impl Hero {
    pub fn from_json(text: &str) -> Result<Hero> {
        let hero: Hero = serde_json::from_str(text)?;
        if hero.name.trim().is_empty() {
            return Err(ConverterError::InvalidCharacter(
                "character has no name".to_string(),
            ));
        }
        Ok(hero)
    }
}

/// A named building block: ancestry, culture, career, inventory entry, etc.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Element {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeroClass {
    pub id: String,
    pub name: String,
    pub description: String,
    pub level: Option<Value>,
    pub characteristics: Vec<CharacteristicValue>,
    pub features_by_level: Vec<FeaturesAtLevel>,
    pub abilities: Vec<ClassAbility>,
    pub subclasses: Vec<Subclass>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CharacteristicValue {
    pub characteristic: String,
    pub value: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeaturesAtLevel {
    pub level: Option<Value>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub feature_type: String,
    pub data: Value,
}

impl Feature {
    /// Compendium references this feature contributes, as `(name, type, description)`.
    pub fn references(&self) -> Vec<(String, ItemType, String)> {
        match self.feature_type.as_str() {
            "Ability" => match self.data.get("ability") {
                Some(ability) => named_entries(std::slice::from_ref(ability), ItemType::Ability),
                None => vec![(self.name.clone(), ItemType::Ability, self.description.clone())],
            },
            "Perk" => self.selected(ItemType::Perk),
            "Kit" => self.selected(ItemType::Kit),
            _ => vec![(self.name.clone(), ItemType::Feature, self.description.clone())],
        }
    }

    fn selected(&self, item_type: ItemType) -> Vec<(String, ItemType, String)> {
        match self.data.get("selected").and_then(Value::as_array) {
            Some(selected) => named_entries(selected, item_type),
            None => Vec::new(),
        }
    }
}

fn named_entries(values: &[Value], item_type: ItemType) -> Vec<(String, ItemType, String)> {
    values
        .iter()
        .filter_map(|v| {
            let name = v.get("name").and_then(Value::as_str)?;
            let description = v
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some((name.to_string(), item_type, description.to_string()))
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassAbility {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(alias = "level")]
    pub min_level: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Subclass {
    pub id: String,
    pub name: String,
    pub description: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeroState {
    pub notes: String,
    pub stamina_temp: i64,
    pub recoveries_used: i64,
    pub victories: i64,
    pub xp: i64,
    pub renown: i64,
    pub wealth: i64,
    pub heroic_resource: i64,
    pub inventory: Vec<Element>,
    pub projects: Vec<Element>,
}
