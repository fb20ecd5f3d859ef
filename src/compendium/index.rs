//! Lookup structures over an acquired compendium.
//!
//! Built once per run and read-only afterwards. Every list preserves the
//! order items were acquired in; duplicate resolution depends on it.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{info, warn};

use super::item::{CanonicalItem, ItemType};
use crate::error::MalformedItemError;

/// Positions into `CompendiumIndex::items`, in insertion order.
pub type Slots = Vec<usize>;

#[derive(Debug, Default)]
struct NameMap {
    exact: IndexMap<String, Slots>,
    folded: IndexMap<String, Slots>,
}

impl NameMap {
    fn insert(&mut self, name: &str, pos: usize) {
        self.exact.entry(name.to_string()).or_default().push(pos);
        self.folded.entry(fold(name)).or_default().push(pos);
    }

    /// Case-sensitive first, then case-insensitive.
    fn lookup(&self, name: &str) -> &[usize] {
        if let Some(slots) = self.exact.get(name) {
            return slots;
        }
        self.folded.get(&fold(name)).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Default)]
struct TypeScope {
    names: NameMap,
    order: Slots,
}

#[derive(Debug, Default)]
pub struct CompendiumIndex {
    items: Vec<CanonicalItem>,
    by_type: HashMap<ItemType, TypeScope>,
    flat: NameMap,
    rejected: Vec<MalformedItemError>,
}

impl CompendiumIndex {
    /// Index `items` in one pass. Records that violate item invariants are dropped.
    pub fn build(items: Vec<CanonicalItem>) -> Self {
        let mut index = CompendiumIndex::default();

        for item in items {
            if let Err(e) = item.validate() {
                warn!(error = %e, "dropping malformed compendium item");
                index.rejected.push(e);
                continue;
            }

            let pos = index.items.len();
            let scope = index.by_type.entry(item.item_type).or_default();
            scope.names.insert(&item.name, pos);
            scope.order.push(pos);
            index.flat.insert(&item.name, pos);
            index.items.push(item);
        }

        info!(
            items = index.items.len(),
            types = index.by_type.len(),
            rejected = index.rejected.len(),
            "compendium indexed"
        );
        index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[CanonicalItem] {
        &self.items
    }

    pub fn item(&self, pos: usize) -> &CanonicalItem {
        &self.items[pos]
    }

    /// Diagnostics for records dropped during the build.
    pub fn rejected(&self) -> &[MalformedItemError] {
        &self.rejected
    }

    /// Exact-name candidates within one type.
    pub fn by_type_and_name(&self, item_type: ItemType, name: &str) -> &[usize] {
        self.by_type
            .get(&item_type)
            .map(|scope| scope.names.lookup(name))
            .unwrap_or(&[])
    }

    /// All items of one type, in insertion order.
    pub fn of_type(&self, item_type: ItemType) -> &[usize] {
        self.by_type
            .get(&item_type)
            .map(|scope| scope.order.as_slice())
            .unwrap_or(&[])
    }

    /// Exact-name candidates across every type.
    pub fn by_name(&self, name: &str) -> &[usize] {
        self.flat.lookup(name)
    }

    /// Case-sensitive type-scoped mapping, for inspection.
    pub fn type_scoped_names(&self, item_type: ItemType) -> Option<&IndexMap<String, Slots>> {
        self.by_type.get(&item_type).map(|scope| &scope.names.exact)
    }

    /// Case-sensitive flat mapping, for inspection.
    pub fn flat_names(&self) -> &IndexMap<String, Slots> {
        &self.flat.exact
    }

    /// Item counts per type, in `ItemType` order.
    pub fn type_counts(&self) -> Vec<(ItemType, usize)> {
        ItemType::ALL
            .iter()
            .filter_map(|t| self.by_type.get(t).map(|scope| (*t, scope.order.len())))
            .collect()
    }
}

pub(crate) fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}
