//! On-disk snapshot of a remotely acquired compendium.
//!
//! One JSON file per remote reference. A snapshot is served only while it is
//! younger than the configured maximum age, was taken from the same
//! reference, and its checksum still matches the stored items.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{CompendiumProvider, Fetched};
use crate::compendium::item::{slugify, CanonicalItem};
use crate::constants::{CACHE_FORMAT_VERSION, CACHE_PROVIDER};
use crate::error::ProviderError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub source_ref: String,
    pub fetched_at: DateTime<Utc>,
    pub checksum: String,
    pub items: Vec<CanonicalItem>,
}

impl Snapshot {
    pub fn new(source_ref: &str, fetched_at: DateTime<Utc>, items: Vec<CanonicalItem>) -> Result<Self, ProviderError> {
        let checksum = checksum(&items)?;
        Ok(Self {
            format_version: CACHE_FORMAT_VERSION,
            source_ref: source_ref.to_string(),
            fetched_at,
            checksum,
            items,
        })
    }
}

/// sha256 over the serialized item list.
pub fn checksum(items: &[CanonicalItem]) -> Result<String, ProviderError> {
    let bytes = serde_json::to_vec(items)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Fixed age threshold. Snapshots stamped in the future count as fresh.
pub fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>, max_age_hours: u64) -> bool {
    let max_age = i64::try_from(max_age_hours)
        .ok()
        .and_then(Duration::try_hours)
        .unwrap_or(Duration::MAX);
    now.signed_duration_since(fetched_at) <= max_age
}

pub fn snapshot_file_name(source_ref: &str) -> String {
    format!("compendium-{}.json", slugify(source_ref))
}

pub struct CacheProvider {
    path: PathBuf,
    source_ref: String,
    max_age_hours: u64,
    read_enabled: bool,
}

impl CacheProvider {
    pub fn new(cache_dir: &Path, source_ref: &str, max_age_hours: u64) -> Self {
        Self {
            path: cache_dir.join(snapshot_file_name(source_ref)),
            source_ref: source_ref.to_string(),
            max_age_hours,
            read_enabled: true,
        }
    }

    /// Skip reads for this run; a successful remote fetch still rewrites the snapshot.
    pub fn write_only(mut self) -> Self {
        self.read_enabled = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Snapshot, ProviderError> {
        if !self.path.exists() {
            return Err(ProviderError::Unavailable(format!(
                "no snapshot at {}",
                self.path.display()
            )));
        }
        let text = fs::read_to_string(&self.path)?;
        let snapshot: Snapshot = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Corrupt(format!("{}: {}", self.path.display(), e)))?;
        Ok(snapshot)
    }
}

impl CompendiumProvider for CacheProvider {
    fn name(&self) -> &str {
        CACHE_PROVIDER
    }

    fn try_acquire(&self) -> Result<Fetched, ProviderError> {
        if !self.read_enabled {
            return Err(ProviderError::Unavailable("cache reads disabled for this run".to_string()));
        }

        let snapshot = self.load()?;
        if snapshot.format_version != CACHE_FORMAT_VERSION {
            return Err(ProviderError::Corrupt(format!(
                "snapshot format {} (expected {})",
                snapshot.format_version, CACHE_FORMAT_VERSION
            )));
        }
        if snapshot.source_ref != self.source_ref {
            return Err(ProviderError::Corrupt(format!(
                "snapshot taken from {} (expected {})",
                snapshot.source_ref, self.source_ref
            )));
        }
        if !is_fresh(snapshot.fetched_at, Utc::now(), self.max_age_hours) {
            return Err(ProviderError::Stale {
                fetched_at: snapshot.fetched_at,
                max_age_hours: self.max_age_hours,
            });
        }
        if checksum(&snapshot.items)? != snapshot.checksum {
            return Err(ProviderError::Corrupt("checksum mismatch".to_string()));
        }
        if snapshot.items.is_empty() {
            return Err(ProviderError::Empty("snapshot holds no items".to_string()));
        }

        debug!(
            path = %self.path.display(),
            fetched_at = %snapshot.fetched_at,
            items = snapshot.items.len(),
            "cache snapshot accepted"
        );
        Ok(Fetched::complete(snapshot.items))
    }

    fn store(&self, items: &[CanonicalItem]) -> Result<(), ProviderError> {
        let snapshot = Snapshot::new(&self.source_ref, Utc::now(), items.to_vec())?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write then rename so readers never see a partial snapshot
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&snapshot)?)?;
        fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), items = items.len(), "compendium snapshot cached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compendium::item::ItemType;
    use tempfile::tempdir;

    const REF: &str = "MetaMorphic-Digital/draw-steel@main";

    fn items() -> Vec<CanonicalItem> {
        vec![CanonicalItem::new("charge", "Charge", ItemType::Ability, "basic")]
    }

    fn write_snapshot(path: &Path, snapshot: &Snapshot) {
        fs::write(path, serde_json::to_vec(snapshot).unwrap()).unwrap();
    }

    #[test]
    fn test_freshness_threshold() {
        let now = Utc::now();
        assert!(is_fresh(now - Duration::hours(2), now, 3));
        assert!(!is_fresh(now - Duration::hours(4), now, 3));
        assert!(is_fresh(now + Duration::hours(1), now, 0));
    }

    #[test]
    fn test_store_then_read_back() {
        let dir = tempdir().unwrap();
        let cache = CacheProvider::new(dir.path(), REF, 24);
        assert!(matches!(cache.try_acquire(), Err(ProviderError::Unavailable(_))));

        cache.store(&items()).unwrap();
        assert!(cache.path().ends_with("compendium-metamorphic-digital-draw-steel-main.json"));
        assert_eq!(cache.try_acquire().unwrap().items, items());
    }

    #[test]
    fn test_float_payload_survives_reload() {
        let dir = tempdir().unwrap();
        let cache = CacheProvider::new(dir.path(), REF, 24);
        let stored: Vec<CanonicalItem> = [985.6906946328695, 0.1 + 0.2, 1e-7, 123456.789e3]
            .iter()
            .enumerate()
            .map(|(n, sort)| {
                let mut item = CanonicalItem::new(&format!("i{}", n), "Sorted", ItemType::Treasure, "");
                item.payload = serde_json::json!({ "sort": sort, "system": { "weight": sort / 3.0 } });
                item
            })
            .collect();

        cache.store(&stored).unwrap();
        let reloaded = cache.try_acquire().unwrap();
        assert_eq!(reloaded.items, stored);
        assert!(reloaded.complete);
    }

    #[test]
    fn test_stale_snapshot_rejected() {
        let dir = tempdir().unwrap();
        let cache = CacheProvider::new(dir.path(), REF, 24);
        let old = Snapshot::new(REF, Utc::now() - Duration::hours(48), items()).unwrap();
        write_snapshot(cache.path(), &old);
        assert!(matches!(cache.try_acquire(), Err(ProviderError::Stale { .. })));
    }

    #[test]
    fn test_tampered_snapshot_rejected() {
        let dir = tempdir().unwrap();
        let cache = CacheProvider::new(dir.path(), REF, 24);
        let mut snapshot = Snapshot::new(REF, Utc::now(), items()).unwrap();
        snapshot.items[0].name = "Charged".to_string();
        write_snapshot(cache.path(), &snapshot);
        assert!(matches!(cache.try_acquire(), Err(ProviderError::Corrupt(_))));

        fs::write(cache.path(), "{ truncated").unwrap();
        assert!(matches!(cache.try_acquire(), Err(ProviderError::Corrupt(_))));
    }

    #[test]
    fn test_other_ref_rejected() {
        let dir = tempdir().unwrap();
        let cache = CacheProvider::new(dir.path(), REF, 24);
        let snapshot = Snapshot::new("someone/else@dev", Utc::now(), items()).unwrap();
        write_snapshot(cache.path(), &snapshot);
        assert!(matches!(cache.try_acquire(), Err(ProviderError::Corrupt(_))));
    }

    #[test]
    fn test_write_only_skips_reads() {
        let dir = tempdir().unwrap();
        let cache = CacheProvider::new(dir.path(), REF, 24).write_only();
        cache.store(&items()).unwrap();
        assert!(matches!(cache.try_acquire(), Err(ProviderError::Unavailable(_))));
        assert!(cache.path().exists());
    }
}
