use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::constants;
use crate::error::{ConverterError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compendium: CompendiumConfig,
    pub cache: CacheConfig,
    pub remote: RemoteConfig,
    pub resolution: ResolutionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompendiumConfig {
    pub local_dir: PathBuf,
}

impl Default for CompendiumConfig {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from(constants::DEFAULT_LOCAL_PACKS_DIR),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
    pub max_age_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            max_age_hours: constants::DEFAULT_CACHE_MAX_AGE_HOURS,
        }
    }
}

impl CacheConfig {
    /// Configured directory, else the per-user cache directory.
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        self.dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join(constants::CACHE_APP_DIR)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub owner: String,
    pub repo: String,
    pub git_ref: String,
    pub packs_path: String,
    /// Bound on the whole archive download, connect to last byte.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            owner: constants::DEFAULT_REMOTE_OWNER.to_string(),
            repo: constants::DEFAULT_REMOTE_REPO.to_string(),
            git_ref: constants::DEFAULT_REMOTE_REF.to_string(),
            packs_path: constants::DEFAULT_REMOTE_PACKS_PATH.to_string(),
            timeout_secs: constants::DEFAULT_TIMEOUT_SECS,
            user_agent: constants::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RemoteConfig {
    /// Identifies the dataset a cache snapshot was taken from.
    pub fn source_ref(&self) -> String {
        format!("{}/{}@{}", self.owner, self.repo, self.git_ref)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub strict: bool,
}

impl Config {
    /// Load `forgesteel.toml` from the working directory if present, then apply env overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(constants::DEFAULT_CONFIG_FILE), false)
    }

    /// Load from `path`. A missing file is an error only when `required` is set.
    pub fn load_from(path: &Path, required: bool) -> Result<Self> {
        let _ = dotenv::dotenv();

        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ConverterError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            debug!(path = %path.display(), "loaded configuration file");
            toml::from_str(&content)?
        } else if required {
            return Err(ConverterError::Config(format!(
                "Config file '{}' does not exist",
                path.display()
            )));
        } else {
            Config::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = env::var("FORGESTEEL_COMPENDIUM") {
            self.compendium.local_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("FORGESTEEL_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(dir));
        }
        if let Ok(hours) = env::var("FORGESTEEL_CACHE_MAX_AGE_HOURS") {
            self.cache.max_age_hours = hours.parse().map_err(|_| {
                ConverterError::Config(format!(
                    "FORGESTEEL_CACHE_MAX_AGE_HOURS must be a whole number, got '{}'",
                    hours
                ))
            })?;
        }
        if let Ok(git_ref) = env::var("FORGESTEEL_REMOTE_REF") {
            self.remote.git_ref = git_ref;
        }
        Ok(())
    }
}
