use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{CompendiumProvider, Fetched};
use crate::compendium::item::items_from_json;
use crate::constants::LOCAL_PROVIDER;
use crate::error::ProviderError;

/// Reads item documents from a pack-source directory tree.
pub struct LocalDirectoryProvider {
    root: PathBuf,
}

impl LocalDirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The pack a file belongs to: its first directory beneath the root.
    fn collection_for(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let mut components = rel.components();
        match (components.next(), components.next()) {
            (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
            _ => self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

impl CompendiumProvider for LocalDirectoryProvider {
    fn name(&self) -> &str {
        LOCAL_PROVIDER
    }

    fn try_acquire(&self) -> Result<Fetched, ProviderError> {
        if !self.root.is_dir() {
            return Err(ProviderError::Unavailable(format!(
                "directory {} does not exist",
                self.root.display()
            )));
        }

        let mut items = Vec::new();
        let mut skipped = 0usize;

        // Sorted traversal keeps insertion order identical between runs
        let entries = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|x| x == "json"));

        for entry in entries {
            let path = entry.path();
            let origin = path.display().to_string();
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(file = %origin, error = %e, "skipping unreadable item file");
                    skipped += 1;
                    continue;
                }
            };
            match items_from_json(&text, &self.collection_for(path), &origin) {
                Ok(parsed) => {
                    debug!(file = %origin, items = parsed.len(), "parsed item file");
                    items.extend(parsed);
                }
                Err(e) => {
                    warn!(file = %origin, error = %e, "skipping unparsable item file");
                    skipped += 1;
                }
            }
        }

        if items.is_empty() {
            return Err(ProviderError::Empty(format!(
                "no items under {} ({} files skipped)",
                self.root.display(),
                skipped
            )));
        }
        if skipped > 0 {
            return Ok(Fetched::partial(items));
        }
        Ok(Fetched::complete(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reads_nested_packs_in_sorted_order() {
        let dir = tempdir().unwrap();
        let abilities = dir.path().join("abilities").join("censor");
        fs::create_dir_all(&abilities).unwrap();
        fs::write(
            abilities.join("b_judgment.json"),
            r#"{"name": "Judgment", "type": "ability", "system": {"_dsid": "judgment"}}"#,
        )
        .unwrap();
        fs::write(
            abilities.join("a_charge.json"),
            r#"{"name": "Charge", "type": "ability", "system": {"_dsid": "charge", "category": "heroic"}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("abilities").join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("abilities").join("broken.json"), "{ nope").unwrap();

        let fetched = LocalDirectoryProvider::new(dir.path()).try_acquire().unwrap();
        assert!(!fetched.complete);
        let items = fetched.items;
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Charge", "Judgment"]);
        assert!(items.iter().all(|i| i.collection == "abilities"));
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let dir = tempdir().unwrap();
        let result = LocalDirectoryProvider::new(dir.path().join("absent")).try_acquire();
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn test_only_broken_files_is_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "[").unwrap();
        let result = LocalDirectoryProvider::new(dir.path()).try_acquire();
        assert!(matches!(result, Err(ProviderError::Empty(_))));
    }
}
