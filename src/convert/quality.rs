//! Post-conversion quality report.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use super::hero::Hero;
use super::level::LevelConsistency;
use crate::compendium::reporter::{ReportSummary, ResolutionReporter};
use crate::constants::{ACTOR_TYPE, PLACEHOLDER_IMG};

const LISTED: usize = 5;
const LOW_MAPPING_RATE: f64 = 0.5;
const REQUIRED_SYSTEM_FIELDS: [&str; 3] = ["characteristics", "stamina", "hero"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityIssue {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub total_items: usize,
    pub mapped_items: usize,
    pub unmapped: Vec<String>,
    pub empty_descriptions: usize,
    pub level: LevelConsistency,
    pub summary: ReportSummary,
    /// First few misses as "name (type) from context".
    pub misses: Vec<String>,
    /// Class abilities available at the detected level.
    pub abilities_expected: usize,
    /// Of those, how many came out as ability items.
    pub abilities_converted: usize,
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn build(
        hero: &Hero,
        actor: &Value,
        level: LevelConsistency,
        reporter: &ResolutionReporter,
    ) -> Self {
        let items = actor
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut mapped_items = 0;
        let mut unmapped = Vec::new();
        let mut empty_descriptions = 0;
        for item in items {
            if is_mapped(item) {
                mapped_items += 1;
            } else if unmapped.len() < LISTED {
                unmapped.push(
                    item.get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("Unnamed item")
                        .to_string(),
                );
            }
            let description = item
                .pointer("/system/description/value")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if description.trim().is_empty() {
                empty_descriptions += 1;
            }
        }

        let misses = reporter
            .misses()
            .take(LISTED)
            .map(|(request, _)| {
                format!(
                    "{} ({}) from {}",
                    request.name,
                    request.declared_type.map(|t| t.as_str()).unwrap_or("untyped"),
                    request.context
                )
            })
            .collect();

        let (abilities_expected, abilities_converted) = ability_counts(hero, items, level.detected);

        let mut report = Self {
            total_items: items.len(),
            mapped_items,
            unmapped,
            empty_descriptions,
            level,
            summary: reporter.summary(),
            misses,
            abilities_expected,
            abilities_converted,
            issues: structure_issues(actor),
        };
        let assessed = report.assess();
        report.issues.extend(assessed);
        report
    }

    pub fn mapping_rate(&self) -> f64 {
        if self.total_items == 0 {
            0.0
        } else {
            self.mapped_items as f64 / self.total_items as f64
        }
    }

    fn assess(&self) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        let rate = self.mapping_rate();
        if rate < LOW_MAPPING_RATE {
            issues.push(QualityIssue {
                severity: Severity::Warning,
                message: format!("Low compendium mapping rate: {:.1}%", rate * 100.0),
            });
        } else {
            issues.push(QualityIssue {
                severity: Severity::Info,
                message: format!("Good compendium mapping rate: {:.1}%", rate * 100.0),
            });
        }
        if !self.level.is_consistent() {
            issues.push(QualityIssue {
                severity: Severity::Warning,
                message: format!("Level sources disagree: {}", self.level),
            });
        }
        if self.empty_descriptions > 0 {
            issues.push(QualityIssue {
                severity: Severity::Warning,
                message: format!("Empty descriptions: {}", self.empty_descriptions),
            });
        }
        if self.abilities_converted < self.abilities_expected {
            issues.push(QualityIssue {
                severity: Severity::Error,
                message: format!(
                    "Ability conversion incomplete: {}/{}",
                    self.abilities_converted, self.abilities_expected
                ),
            });
        }
        if self.summary.misses > 0 {
            issues.push(QualityIssue {
                severity: Severity::Error,
                message: format!("Unresolved references: {}", self.summary.misses),
            });
        }
        issues
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

fn error(message: String) -> QualityIssue {
    QualityIssue {
        severity: Severity::Error,
        message,
    }
}

/// Shape checks on the actor document itself.
fn structure_issues(actor: &Value) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    let name = actor.get("name").and_then(Value::as_str).unwrap_or_default();
    if name.trim().is_empty() {
        issues.push(error("Character missing name".to_string()));
    }
    if actor.get("type").and_then(Value::as_str) != Some(ACTOR_TYPE) {
        issues.push(error(format!("Character type is not '{}'", ACTOR_TYPE)));
    }
    match actor.get("system") {
        None => issues.push(error("Character missing system data".to_string())),
        Some(system) => {
            let missing: Vec<_> = REQUIRED_SYSTEM_FIELDS
                .iter()
                .filter(|field| system.get(**field).is_none())
                .copied()
                .collect();
            if !missing.is_empty() {
                issues.push(error(format!(
                    "Missing required system fields: {}",
                    missing.join(", ")
                )));
            }
        }
    }
    issues
}

/// Distinct class abilities unlocked at `level`, and how many of them appear
/// among the actor's ability items. Names compare case-insensitively.
fn ability_counts(hero: &Hero, items: &[Value], level: i64) -> (usize, usize) {
    let expected: HashSet<String> = hero
        .class
        .iter()
        .flat_map(|class| &class.abilities)
        .filter(|a| !a.name.trim().is_empty() && a.min_level.map_or(true, |min| min <= level))
        .map(|a| a.name.trim().to_lowercase())
        .collect();
    let produced: HashSet<String> = items
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("ability"))
        .filter_map(|item| item.get("name").and_then(Value::as_str))
        .map(|name| name.trim().to_lowercase())
        .collect();
    let converted = expected.intersection(&produced).count();
    (expected.len(), converted)
}

/// An item counts as mapped if it carries a compendium source or a real image.
fn is_mapped(item: &Value) -> bool {
    let has_source = item
        .pointer("/_stats/compendiumSource")
        .is_some_and(|v| !v.is_null());
    let has_image = item
        .get("img")
        .and_then(Value::as_str)
        .is_some_and(|img| img != PLACEHOLDER_IMG);
    has_source || has_image
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Conversion Quality Report ===")?;
        writeln!(f, "{}", self.level)?;
        writeln!(
            f,
            "Items: {} ({} mapped, {:.1}%)",
            self.total_items,
            self.mapped_items,
            self.mapping_rate() * 100.0
        )?;
        writeln!(f, "{}", self.summary)?;

        if !self.misses.is_empty() {
            writeln!(f, "\nUnresolved references (first {}):", LISTED)?;
            for miss in &self.misses {
                writeln!(f, "  - {}", miss)?;
            }
        }
        if !self.unmapped.is_empty() {
            writeln!(f, "\nUnmapped items (first {}):", LISTED)?;
            for name in &self.unmapped {
                writeln!(f, "  - {}", name)?;
            }
        }

        for (label, severity) in [("Errors", Severity::Error), ("Warnings", Severity::Warning)] {
            let matching: Vec<_> = self.issues.iter().filter(|i| i.severity == severity).collect();
            if !matching.is_empty() {
                writeln!(f, "\n{} ({}):", label, matching.len())?;
                for issue in matching {
                    writeln!(f, "  - {}", issue.message)?;
                }
            }
        }

        writeln!(f, "\n=== Overall Assessment ===")?;
        let assessment = match (self.count(Severity::Error), self.count(Severity::Warning)) {
            (0, 0) => "Excellent: all references resolved with no warnings",
            (0, _) => "Good: all references resolved with some warnings",
            _ if self.mapping_rate() >= 0.9 => "Fair: most references resolved, some placeholders used",
            _ => "Poor: significant unresolved references",
        };
        write!(f, "{}", assessment)
    }
}
