//! Use cases wiring acquisition, indexing, resolution and mapping together.

use std::path::PathBuf;

use tracing::{info, info_span};

use crate::compendium::{
    CompendiumIndex, ItemType, ResolutionMode, ResolutionRequest, ResolutionResult,
    ResolutionReporter, Resolver,
};
use crate::config::Config;
use crate::convert::level::check_consistency;
use crate::convert::{convert_character, QualityReport};
use crate::error::Result;
use crate::sources::{self, AcquireOptions, ProviderChain};
use crate::writer::{read_hero, write_actor};

/// An indexed compendium and where it came from.
pub struct LoadedCompendium {
    pub provider: String,
    pub index: CompendiumIndex,
}

pub fn load_compendium(chain: &ProviderChain) -> Result<LoadedCompendium> {
    let span = info_span!("compendium", providers = ?chain.provider_names());
    let _enter = span.enter();

    let acquired = chain.acquire()?;
    let index = CompendiumIndex::build(acquired.items);
    Ok(LoadedCompendium {
        provider: acquired.provider,
        index,
    })
}

#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub strict: bool,
}

pub struct ConvertRun {
    pub provider: String,
    pub indexed_items: usize,
    pub placeholders: usize,
    pub reporter: ResolutionReporter,
    pub report: QualityReport,
}

/// Read the hero, resolve against `chain`'s compendium, write the actor document.
pub fn run_convert(chain: &ProviderChain, request: &ConvertRequest) -> Result<ConvertRun> {
    let hero = read_hero(&request.input)?;
    let compendium = load_compendium(chain)?;

    let mode = if request.strict {
        ResolutionMode::Strict
    } else {
        ResolutionMode::Lenient
    };
    let mut resolver = Resolver::new(&compendium.index, mode);
    let outcome = convert_character(&hero, &mut resolver)?;
    let reporter = resolver.into_reporter();

    write_actor(&request.output, &outcome.actor)?;

    let report = QualityReport::build(&hero, &outcome.actor, check_consistency(&hero), &reporter);
    info!(
        provider = %compendium.provider,
        level = outcome.level.level,
        level_clamped = outcome.level.clamped,
        placeholders = outcome.placeholders,
        "conversion finished"
    );
    Ok(ConvertRun {
        provider: compendium.provider,
        indexed_items: compendium.index.len(),
        placeholders: outcome.placeholders,
        reporter,
        report,
    })
}

/// Convenience for callers holding configuration rather than a chain.
pub fn convert_with_config(
    config: &Config,
    options: &AcquireOptions,
    request: &ConvertRequest,
) -> Result<ConvertRun> {
    run_convert(&sources::build_chain(config, options), request)
}

/// Resolve a single reference and describe the outcome.
pub fn describe_resolution(
    index: &CompendiumIndex,
    name: &str,
    item_type: Option<ItemType>,
) -> String {
    let mut resolver = Resolver::new(index, ResolutionMode::Lenient);
    let request = ResolutionRequest::new(name, item_type, "command line");
    match resolver.resolve(&request) {
        Ok(ResolutionResult::Resolved { item, tier }) => {
            let mut text = format!(
                "{} [{}] id={} collection={} category={} via {}",
                item.name,
                item.item_type,
                item.id,
                item.collection,
                if item.category.is_empty() { "-" } else { item.category.as_str() },
                tier.label()
            );
            let summary = resolver.reporter().summary();
            if summary.duplicates_resolved > 0 {
                text.push_str(" (chosen among duplicates)");
            }
            text
        }
        Ok(ResolutionResult::NotFound { tiers_attempted, .. }) => format!(
            "{} not found (tiers attempted: {})",
            name,
            tiers_attempted
                .iter()
                .map(|t| t.label())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        // Lenient resolvers never fail
        Err(e) => e.to_string(),
    }
}
