//! Canonical compendium items and their construction from pack-source documents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::FOLDER_KEY_PREFIX;
use crate::error::MalformedItemError;

/// The fixed set of item kinds the resolver scopes lookups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Ability,
    Ancestry,
    Culture,
    Career,
    Class,
    Subclass,
    Perk,
    Project,
    Treasure,
    Complication,
    Kit,
    Feature,
    Other,
}

impl ItemType {
    pub const ALL: [ItemType; 13] = [
        ItemType::Ability,
        ItemType::Ancestry,
        ItemType::Culture,
        ItemType::Career,
        ItemType::Class,
        ItemType::Subclass,
        ItemType::Perk,
        ItemType::Project,
        ItemType::Treasure,
        ItemType::Complication,
        ItemType::Kit,
        ItemType::Feature,
        ItemType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Ability => "ability",
            ItemType::Ancestry => "ancestry",
            ItemType::Culture => "culture",
            ItemType::Career => "career",
            ItemType::Class => "class",
            ItemType::Subclass => "subclass",
            ItemType::Perk => "perk",
            ItemType::Project => "project",
            ItemType::Treasure => "treasure",
            ItemType::Complication => "complication",
            ItemType::Kit => "kit",
            ItemType::Feature => "feature",
            ItemType::Other => "other",
        }
    }

    /// Map a document `type` string to an item kind. Unknown kinds become `Other`.
    pub fn from_platform(raw: &str) -> ItemType {
        raw.parse().unwrap_or(ItemType::Other)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ItemType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown item type '{}'", s))
    }
}

/// An authoritative record from the reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalItem {
    /// Logical identifier; may repeat across collections.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Variant qualifier such as "heroic" or "signature". Empty when absent.
    #[serde(default)]
    pub category: String,
    /// Pack the item was read from.
    #[serde(default)]
    pub collection: String,
    /// The full source document, passed through to the output untouched.
    #[serde(default)]
    pub payload: Value,
}

impl CanonicalItem {
    pub fn new(id: &str, name: &str, item_type: ItemType, category: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            item_type,
            category: category.to_string(),
            collection: String::new(),
            payload: Value::Null,
        }
    }

    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = collection.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), MalformedItemError> {
        if self.name.trim().is_empty() {
            return Err(MalformedItemError::EmptyName { id: self.id.clone() });
        }
        Ok(())
    }

    /// Heroic and augmented variants lose ties against their base form.
    pub fn is_augmented_variant(&self) -> bool {
        let category = self.category.to_ascii_lowercase();
        category.contains("heroic") || category.contains("augment")
    }

    /// Build an item from one pack-source document.
    pub fn from_document(
        doc: Value,
        collection: &str,
        origin: &str,
    ) -> Result<CanonicalItem, MalformedItemError> {
        let obj = doc.as_object().ok_or_else(|| MalformedItemError::NotAnItem {
            origin: origin.to_string(),
        })?;

        if obj
            .get("_key")
            .and_then(Value::as_str)
            .is_some_and(|k| k.starts_with(FOLDER_KEY_PREFIX))
        {
            return Err(MalformedItemError::NotAnItem {
                origin: origin.to_string(),
            });
        }

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| MalformedItemError::MissingField {
                field: "name",
                origin: origin.to_string(),
            })?
            .to_string();
        let item_type = obj
            .get("type")
            .and_then(Value::as_str)
            .map(ItemType::from_platform)
            .ok_or_else(|| MalformedItemError::MissingField {
                field: "type",
                origin: origin.to_string(),
            })?;

        let system = obj.get("system");
        let id = system
            .and_then(|s| s.get("_dsid"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| obj.get("_id").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| slugify(&name));
        let category = system
            .and_then(|s| s.get("category"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(CanonicalItem {
            id,
            name,
            item_type,
            category,
            collection: collection.to_string(),
            payload: doc,
        })
    }
}

/// Parse a file body holding one document or an array of documents.
/// Documents that are not items are skipped; only invalid JSON fails the file.
pub fn items_from_json(
    text: &str,
    collection: &str,
    origin: &str,
) -> Result<Vec<CanonicalItem>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let docs = match value {
        Value::Array(docs) => docs,
        other => vec![other],
    };

    let mut items = Vec::with_capacity(docs.len());
    for doc in docs {
        match CanonicalItem::from_document(doc, collection, origin) {
            Ok(item) => items.push(item),
            Err(MalformedItemError::NotAnItem { .. }) => {
                debug!(origin, "skipping non-item document");
            }
            Err(e) => warn!(origin, error = %e, "skipping malformed document"),
        }
    }
    Ok(items)
}

/// Lowercase, hyphen-separated form of a name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
