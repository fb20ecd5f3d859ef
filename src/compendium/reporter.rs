//! Write-only sink for resolution diagnostics.

use std::fmt;

use serde::Serialize;

use super::item::{CanonicalItem, ItemType};
use super::resolver::{MatchTier, ResolutionRequest};

/// Identity of a candidate, kept so rejected candidates can be replayed after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRef {
    pub id: String,
    pub name: String,
    pub item_type: ItemType,
    pub category: String,
    pub collection: String,
}

impl From<&CanonicalItem> for ItemRef {
    fn from(item: &CanonicalItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            item_type: item.item_type,
            category: item.category.clone(),
            collection: item.collection.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResolutionEvent {
    TierHit {
        tier: MatchTier,
        request: ResolutionRequest,
    },
    DuplicateResolved {
        tier: MatchTier,
        request: ResolutionRequest,
        chosen: ItemRef,
        rejected: Vec<ItemRef>,
    },
    Miss {
        request: ResolutionRequest,
        tiers_attempted: Vec<MatchTier>,
    },
}

/// Counts per event kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub type_exact_hits: usize,
    pub type_partial_hits: usize,
    pub name_only_hits: usize,
    pub duplicates_resolved: usize,
    pub misses: usize,
}

impl ReportSummary {
    pub fn hits(&self) -> usize {
        self.type_exact_hits + self.type_partial_hits + self.name_only_hits
    }

    pub fn requests(&self) -> usize {
        self.hits() + self.misses
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resolved {} of {} references", self.hits(), self.requests())?;
        writeln!(f, "  type+exact:   {}", self.type_exact_hits)?;
        writeln!(f, "  type+partial: {}", self.type_partial_hits)?;
        writeln!(f, "  name-only:    {}", self.name_only_hits)?;
        writeln!(f, "  duplicates resolved: {}", self.duplicates_resolved)?;
        write!(f, "  misses: {}", self.misses)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionReporter {
    events: Vec<ResolutionEvent>,
}

impl ResolutionReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: ResolutionEvent) {
        match &event {
            ResolutionEvent::TierHit { tier, .. } => {
                ::metrics::counter!("converter_resolution_tier_hits_total", "tier" => tier.label())
                    .increment(1);
            }
            ResolutionEvent::DuplicateResolved { .. } => {
                ::metrics::counter!("converter_resolution_duplicates_total").increment(1);
            }
            ResolutionEvent::Miss { .. } => {
                ::metrics::counter!("converter_resolution_misses_total").increment(1);
            }
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[ResolutionEvent] {
        &self.events
    }

    /// Missed requests, in the order they occurred.
    pub fn misses(&self) -> impl Iterator<Item = (&ResolutionRequest, &[MatchTier])> {
        self.events.iter().filter_map(|e| match e {
            ResolutionEvent::Miss {
                request,
                tiers_attempted,
            } => Some((request, tiers_attempted.as_slice())),
            _ => None,
        })
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for event in &self.events {
            match event {
                ResolutionEvent::TierHit { tier, .. } => match tier {
                    MatchTier::TypeExact => summary.type_exact_hits += 1,
                    MatchTier::TypePartial => summary.type_partial_hits += 1,
                    MatchTier::NameOnly => summary.name_only_hits += 1,
                },
                ResolutionEvent::DuplicateResolved { .. } => summary.duplicates_resolved += 1,
                ResolutionEvent::Miss { .. } => summary.misses += 1,
            }
        }
        summary
    }

    /// Append another reporter's events after this one's.
    pub fn merge(&mut self, other: ResolutionReporter) {
        self.events.extend(other.events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> ResolutionRequest {
        ResolutionRequest::new(name, Some(ItemType::Ability), "test")
    }

    #[test]
    fn test_summary_counts_each_kind() {
        let mut reporter = ResolutionReporter::new();
        reporter.record(ResolutionEvent::TierHit {
            tier: MatchTier::TypeExact,
            request: request("Charge"),
        });
        reporter.record(ResolutionEvent::TierHit {
            tier: MatchTier::NameOnly,
            request: request("Grab"),
        });
        reporter.record(ResolutionEvent::Miss {
            request: request("Nothing"),
            tiers_attempted: vec![MatchTier::TypeExact, MatchTier::TypePartial, MatchTier::NameOnly],
        });

        let summary = reporter.summary();
        assert_eq!(summary.type_exact_hits, 1);
        assert_eq!(summary.name_only_hits, 1);
        assert_eq!(summary.misses, 1);
        assert_eq!(summary.requests(), 3);

        let misses: Vec<_> = reporter.misses().collect();
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].0.name, "Nothing");
        assert_eq!(misses[0].1.len(), 3);
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut first = ResolutionReporter::new();
        first.record(ResolutionEvent::Miss {
            request: request("A"),
            tiers_attempted: vec![],
        });
        let mut second = ResolutionReporter::new();
        second.record(ResolutionEvent::Miss {
            request: request("B"),
            tiers_attempted: vec![],
        });

        first.merge(second);
        let names: Vec<_> = first.misses().map(|(r, _)| r.name.clone()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
