//! Character level detection from several places in the hero record.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::hero::Hero;
use crate::constants::{MAX_LEVEL, MIN_LEVEL};

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    Character,
    Class,
    FeaturesByLevel,
}

impl LevelSource {
    pub fn label(&self) -> &'static str {
        match self {
            LevelSource::Character => "character.level",
            LevelSource::Class => "class.level",
            LevelSource::FeaturesByLevel => "featuresByLevel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelDetection {
    pub level: i64,
    /// `None` when no source held a usable value and the default applied.
    pub source: Option<LevelSource>,
    pub clamped: bool,
}

/// Accept integers, integral floats, and strings such as "level 5" or "5th".
pub fn normalize_level(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 {
                    Some(f as i64)
                } else {
                    warn!(value = f, "non-integer level value");
                    None
                }
            }
        }
        Value::String(s) => {
            let parsed = DIGITS.find(s).and_then(|m| m.as_str().parse().ok());
            if parsed.is_none() {
                warn!(value = %s, "could not parse level from string");
            }
            parsed
        }
        Value::Null => None,
        other => {
            warn!(value = %other, "unrecognized level format");
            None
        }
    }
}

/// Every source that yields a level, in priority order.
pub fn levels_found(hero: &Hero) -> Vec<(LevelSource, i64)> {
    let mut found = Vec::new();
    if let Some(level) = hero.level.as_ref().and_then(normalize_level) {
        found.push((LevelSource::Character, level));
    }
    if let Some(class) = &hero.class {
        if let Some(level) = class.level.as_ref().and_then(normalize_level) {
            found.push((LevelSource::Class, level));
        }
        let max_feature_level = class
            .features_by_level
            .iter()
            .filter_map(|f| f.level.as_ref().and_then(normalize_level))
            .max();
        if let Some(level) = max_feature_level {
            found.push((LevelSource::FeaturesByLevel, level));
        }
    }
    found
}

pub fn detect_level(hero: &Hero) -> LevelDetection {
    match levels_found(hero).first() {
        Some(&(source, raw)) => {
            let level = raw.clamp(MIN_LEVEL, MAX_LEVEL);
            if level != raw {
                warn!(raw, level, "level normalized into valid range");
            }
            debug!(level, source = source.label(), "level detected");
            LevelDetection {
                level,
                source: Some(source),
                clamped: level != raw,
            }
        }
        None => {
            warn!("no level detected, using default level {}", MIN_LEVEL);
            LevelDetection {
                level: MIN_LEVEL,
                source: None,
                clamped: false,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelConsistency {
    pub detected: i64,
    pub levels_found: Vec<(LevelSource, i64)>,
    /// Sources that disagree with the detected level, with the difference.
    pub inconsistencies: Vec<(LevelSource, i64, i64)>,
}

impl LevelConsistency {
    pub fn is_consistent(&self) -> bool {
        self.inconsistencies.is_empty()
    }
}

pub fn check_consistency(hero: &Hero) -> LevelConsistency {
    let detected = detect_level(hero).level;
    let levels_found = levels_found(hero);
    let inconsistencies = levels_found
        .iter()
        .filter(|(_, level)| *level != detected)
        .map(|&(source, level)| (source, level, level - detected))
        .collect();
    LevelConsistency {
        detected,
        levels_found,
        inconsistencies,
    }
}

impl fmt::Display for LevelConsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Detected level: {}", self.detected)?;
        if self.is_consistent() {
            return write!(f, " | Sources consistent");
        }
        write!(f, " | Sources inconsistent:")?;
        for (source, level, diff) in &self.inconsistencies {
            write!(f, " {}={} ({:+})", source.label(), level, diff)?;
        }
        Ok(())
    }
}
