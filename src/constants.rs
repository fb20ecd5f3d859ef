//! Defaults shared by configuration, providers and the mapper.

// Conventional local checkout of the system repository's pack sources
pub const DEFAULT_LOCAL_PACKS_DIR: &str = "draw_steel_repo/src/packs";
pub const DEFAULT_CONFIG_FILE: &str = "forgesteel.toml";

// Remote archive reference
pub const DEFAULT_REMOTE_OWNER: &str = "MetaMorphic-Digital";
pub const DEFAULT_REMOTE_REPO: &str = "draw-steel";
pub const DEFAULT_REMOTE_REF: &str = "main";
pub const DEFAULT_REMOTE_PACKS_PATH: &str = "src/packs";
pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_USER_AGENT: &str = concat!("forgesteel-converter/", env!("CARGO_PKG_VERSION"));

// Cache
pub const CACHE_APP_DIR: &str = "forgesteel-converter";
pub const DEFAULT_CACHE_MAX_AGE_HOURS: u64 = 168;
pub const CACHE_FORMAT_VERSION: u32 = 1;

// Provider names used in logs and errors
pub const LOCAL_PROVIDER: &str = "local";
pub const CACHE_PROVIDER: &str = "cache";
pub const REMOTE_PROVIDER: &str = "remote";

// Output document
pub const SYSTEM_ID: &str = "draw-steel";
pub const FLAGS_SCOPE: &str = "forgesteel-converter";
pub const PLACEHOLDER_IMG: &str = "icons/svg/mystery-man.svg";
pub const ACTOR_TYPE: &str = "hero";

// Logging
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "converter.log";

// Level bounds applied by level detection
pub const MIN_LEVEL: i64 = 1;
pub const MAX_LEVEL: i64 = 20;

/// Folder documents in pack sources carry keys with this prefix.
pub const FOLDER_KEY_PREFIX: &str = "!folders!";
