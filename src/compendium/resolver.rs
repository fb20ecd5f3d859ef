//! Tiered resolution of character references against the compendium index.
//!
//! Tiers run in order and the first non-empty candidate set wins:
//! type + exact name, type + partial name, then exact name across all types.
//! When a tier returns several candidates a [`CandidateOrdering`] picks one;
//! ties fall back to insertion order so results are reproducible.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, warn};

use super::index::{fold, CompendiumIndex};
use super::item::{CanonicalItem, ItemType};
use super::reporter::{ItemRef, ResolutionEvent, ResolutionReporter};
use crate::error::StrictResolutionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    TypeExact,
    TypePartial,
    NameOnly,
}

impl MatchTier {
    pub fn label(&self) -> &'static str {
        match self {
            MatchTier::TypeExact => "type+exact",
            MatchTier::TypePartial => "type+partial",
            MatchTier::NameOnly => "name-only",
        }
    }
}

/// A character-owned reference to a compendium item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionRequest {
    pub name: String,
    pub declared_type: Option<ItemType>,
    /// Where in the character record the reference came from.
    pub context: String,
}

impl ResolutionRequest {
    pub fn new(name: &str, declared_type: Option<ItemType>, context: &str) -> Self {
        Self {
            name: name.to_string(),
            declared_type,
            context: context.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionResult<'a> {
    Resolved {
        item: &'a CanonicalItem,
        tier: MatchTier,
    },
    NotFound {
        request: ResolutionRequest,
        tiers_attempted: Vec<MatchTier>,
    },
}

impl<'a> ResolutionResult<'a> {
    pub fn item(&self) -> Option<&'a CanonicalItem> {
        match self {
            ResolutionResult::Resolved { item, .. } => Some(*item),
            ResolutionResult::NotFound { .. } => None,
        }
    }

    pub fn tier(&self) -> Option<MatchTier> {
        match self {
            ResolutionResult::Resolved { tier, .. } => Some(*tier),
            ResolutionResult::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ResolutionResult::Resolved { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Misses are returned as `NotFound`.
    #[default]
    Lenient,
    /// The first miss is an error.
    Strict,
}

/// Orders candidates from one tier; the least candidate wins.
pub trait CandidateOrdering: Send + Sync {
    fn compare(&self, a: &CanonicalItem, b: &CanonicalItem) -> Ordering;
}

/// Prefer base variants over heroic or augmented ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferBaseVariant;

impl CandidateOrdering for PreferBaseVariant {
    fn compare(&self, a: &CanonicalItem, b: &CanonicalItem) -> Ordering {
        a.is_augmented_variant().cmp(&b.is_augmented_variant())
    }
}

/// Always take the first candidate in insertion order.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertionOrder;

impl CandidateOrdering for InsertionOrder {
    fn compare(&self, _a: &CanonicalItem, _b: &CanonicalItem) -> Ordering {
        Ordering::Equal
    }
}

pub struct Resolver<'a> {
    index: &'a CompendiumIndex,
    ordering: Box<dyn CandidateOrdering>,
    mode: ResolutionMode,
    reporter: ResolutionReporter,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a CompendiumIndex, mode: ResolutionMode) -> Self {
        Self::with_ordering(index, mode, Box::new(PreferBaseVariant))
    }

    pub fn with_ordering(
        index: &'a CompendiumIndex,
        mode: ResolutionMode,
        ordering: Box<dyn CandidateOrdering>,
    ) -> Self {
        Self {
            index,
            ordering,
            mode,
            reporter: ResolutionReporter::new(),
        }
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    pub fn reporter(&self) -> &ResolutionReporter {
        &self.reporter
    }

    pub fn into_reporter(self) -> ResolutionReporter {
        self.reporter
    }

    /// Resolve one reference. Errors only for a miss in strict mode.
    pub fn resolve(
        &mut self,
        request: &ResolutionRequest,
    ) -> Result<ResolutionResult<'a>, StrictResolutionError> {
        let mut tiers_attempted = Vec::with_capacity(3);

        for &tier in Self::tiers_for(request) {
            tiers_attempted.push(tier);
            let candidates = self.candidates(tier, request);
            if candidates.is_empty() {
                continue;
            }

            let chosen = self.choose(tier, request, &candidates);
            let item = self.index.item(chosen);
            debug!(
                name = %request.name,
                tier = tier.label(),
                id = %item.id,
                context = %request.context,
                "reference resolved"
            );
            self.reporter.record(ResolutionEvent::TierHit {
                tier,
                request: request.clone(),
            });
            return Ok(ResolutionResult::Resolved { item, tier });
        }

        warn!(
            name = %request.name,
            declared_type = request.declared_type.map(|t| t.as_str()).unwrap_or("none"),
            context = %request.context,
            "reference not found in compendium"
        );
        self.reporter.record(ResolutionEvent::Miss {
            request: request.clone(),
            tiers_attempted: tiers_attempted.clone(),
        });

        match self.mode {
            ResolutionMode::Lenient => Ok(ResolutionResult::NotFound {
                request: request.clone(),
                tiers_attempted,
            }),
            ResolutionMode::Strict => Err(StrictResolutionError {
                name: request.name.clone(),
                declared_type: request.declared_type,
                context: request.context.clone(),
                tiers_attempted,
            }),
        }
    }

    /// Untyped requests go straight to the name-only tier.
    fn tiers_for(request: &ResolutionRequest) -> &'static [MatchTier] {
        if request.declared_type.is_some() {
            &[MatchTier::TypeExact, MatchTier::TypePartial, MatchTier::NameOnly]
        } else {
            &[MatchTier::NameOnly]
        }
    }

    fn candidates(&self, tier: MatchTier, request: &ResolutionRequest) -> Vec<usize> {
        let name = request.name.trim();
        if name.is_empty() {
            return Vec::new();
        }

        match (tier, request.declared_type) {
            (MatchTier::TypeExact, Some(ty)) => self.index.by_type_and_name(ty, name).to_vec(),
            (MatchTier::TypePartial, Some(ty)) => {
                let wanted = fold(name);
                self.index
                    .of_type(ty)
                    .iter()
                    .copied()
                    .filter(|pos| {
                        let candidate = fold(&self.index.item(*pos).name);
                        candidate.contains(&wanted) || wanted.contains(&candidate)
                    })
                    .collect()
            }
            (MatchTier::NameOnly, _) => self.index.by_name(name).to_vec(),
            _ => Vec::new(),
        }
    }

    /// Pick the least candidate; the earliest wins among equals.
    fn choose(&mut self, tier: MatchTier, request: &ResolutionRequest, candidates: &[usize]) -> usize {
        let mut best = candidates[0];
        for &pos in &candidates[1..] {
            let ord = self
                .ordering
                .compare(self.index.item(pos), self.index.item(best));
            if ord == Ordering::Less {
                best = pos;
            }
        }

        if candidates.len() > 1 {
            let chosen = self.index.item(best);
            let rejected: Vec<ItemRef> = candidates
                .iter()
                .filter(|pos| **pos != best)
                .map(|pos| ItemRef::from(self.index.item(*pos)))
                .collect();
            debug!(
                name = %request.name,
                chosen = %chosen.id,
                category = %chosen.category,
                rejected = rejected.len(),
                "duplicate candidates resolved"
            );
            self.reporter.record(ResolutionEvent::DuplicateResolved {
                tier,
                request: request.clone(),
                chosen: ItemRef::from(chosen),
                rejected,
            });
        }
        best
    }
}
