//! Compendium model, index, tiered resolver and its diagnostic sink.

pub mod index;
pub mod item;
pub mod reporter;
pub mod resolver;

pub use index::CompendiumIndex;
pub use item::{CanonicalItem, ItemType};
pub use reporter::{ReportSummary, ResolutionEvent, ResolutionReporter};
pub use resolver::{
    CandidateOrdering, MatchTier, PreferBaseVariant, ResolutionMode, ResolutionRequest,
    ResolutionResult, Resolver,
};
