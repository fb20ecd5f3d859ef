use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::compendium::item::ItemType;
use crate::compendium::resolver::MatchTier;

/// Why a single compendium provider could not supply items.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("source not available: {0}")]
    Unavailable(String),

    #[error("cached snapshot is stale (fetched {fetched_at}, max age {max_age_hours}h)")]
    Stale {
        fetched_at: DateTime<Utc>,
        max_age_hours: u64,
    },

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("source yielded no items: {0}")]
    Empty(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("unexpected HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("remote rate limit exhausted{}", reset_hint(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },
}

fn reset_hint(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(", resets at {}", at.to_rfc3339()),
        None => String::new(),
    }
}

impl ProviderError {
    /// Failures a caller can reasonably retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. } | ProviderError::Http(_))
    }
}

/// Every provider in the chain failed.
#[derive(Debug)]
pub struct AcquisitionError {
    pub attempts: Vec<(String, ProviderError)>,
}

impl AcquisitionError {
    pub fn is_retryable(&self) -> bool {
        self.attempts.iter().any(|(_, e)| e.is_transient())
    }

    pub fn rate_limited(&self) -> bool {
        self.attempts
            .iter()
            .any(|(_, e)| matches!(e, ProviderError::RateLimited { .. }))
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return write!(f, "compendium acquisition failed: no sources configured");
        }
        write!(f, "compendium acquisition failed after {} source(s)", self.attempts.len())?;
        for (provider, err) in &self.attempts {
            write!(f, "; {}: {}", provider, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for AcquisitionError {}

/// A record that cannot become a `CanonicalItem`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedItemError {
    #[error("missing required field `{field}` in {origin}")]
    MissingField { field: &'static str, origin: String },

    #[error("item `{id}` has an empty name")]
    EmptyName { id: String },

    #[error("document in {origin} is not an item")]
    NotAnItem { origin: String },
}

/// A reference that resolved to nothing while running in strict mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unresolved reference `{name}` ({}) from {context}; tiers attempted: {}", type_label(.declared_type), tier_list(.tiers_attempted))]
pub struct StrictResolutionError {
    pub name: String,
    pub declared_type: Option<ItemType>,
    pub context: String,
    pub tiers_attempted: Vec<MatchTier>,
}

fn type_label(ty: &Option<ItemType>) -> String {
    ty.map(|t| t.as_str().to_string())
        .unwrap_or_else(|| "untyped".to_string())
}

fn tier_list(tiers: &[MatchTier]) -> String {
    tiers
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum ConverterError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    StrictResolution(#[from] StrictResolutionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid character record: {0}")]
    InvalidCharacter(String),
}

pub type Result<T> = std::result::Result<T, ConverterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_error_lists_every_attempt() {
        let err = AcquisitionError {
            attempts: vec![
                ("local".to_string(), ProviderError::Unavailable("no dir".to_string())),
                ("remote".to_string(), ProviderError::RateLimited { reset_at: None }),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("local: source not available: no dir"));
        assert!(text.contains("remote: remote rate limit exhausted"));
        assert!(err.is_retryable());
        assert!(err.rate_limited());
    }

    #[test]
    fn test_strict_error_message() {
        let err = StrictResolutionError {
            name: "Charge".to_string(),
            declared_type: Some(ItemType::Ability),
            context: "class.abilities".to_string(),
            tiers_attempted: vec![MatchTier::TypeExact, MatchTier::TypePartial, MatchTier::NameOnly],
        };
        let text = err.to_string();
        assert!(text.contains("`Charge` (ability)"));
        assert!(text.contains("class.abilities"));
        assert!(text.contains("type+exact"));
    }
}
