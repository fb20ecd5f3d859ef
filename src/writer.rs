use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::convert::Hero;
use crate::error::Result;

pub fn read_hero(path: &Path) -> Result<Hero> {
    let text = fs::read_to_string(path)?;
    Hero::from_json(&text)
}

/// Write the actor document as pretty-printed JSON, creating parent directories.
pub fn write_actor(path: &Path, actor: &Value) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut text = serde_json::to_string_pretty(actor)?;
    text.push('\n');
    fs::write(path, text)?;
    info!(path = %path.display(), "actor document written");
    Ok(())
}
