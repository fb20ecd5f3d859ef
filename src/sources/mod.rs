//! Compendium acquisition through a ranked provider chain.
//!
//! Providers are tried in priority order (local directory, cache snapshot,
//! remote archive) and the first one that yields items wins. When the winner
//! is an origin source, every provider ahead of it is offered the items so
//! the cache is refreshed for the next run.

pub mod cache;
pub mod http;
pub mod local;
pub mod remote;

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, info_span, warn};

use crate::compendium::item::CanonicalItem;
use crate::config::Config;
use crate::error::{AcquisitionError, ProviderError};

pub use cache::CacheProvider;
pub use http::{HttpClientPort, HttpGetResult, ReqwestHttp};
pub use local::LocalDirectoryProvider;
pub use remote::RemoteArchiveProvider;

/// Items returned by one provider. `complete` is false when the provider
/// knows part of its source could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub items: Vec<CanonicalItem>,
    pub complete: bool,
}

impl Fetched {
    pub fn complete(items: Vec<CanonicalItem>) -> Self {
        Self {
            items,
            complete: true,
        }
    }

    pub fn partial(items: Vec<CanonicalItem>) -> Self {
        Self {
            items,
            complete: false,
        }
    }
}

/// One source of canonical items.
pub trait CompendiumProvider: Send + Sync {
    fn name(&self) -> &str;

    fn try_acquire(&self) -> Result<Fetched, ProviderError>;

    /// True for sources whose complete results are written back to earlier providers.
    fn is_origin(&self) -> bool {
        false
    }

    /// Accept items acquired by a lower-priority origin. Most providers ignore them.
    fn store(&self, _items: &[CanonicalItem]) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Items plus the provider that supplied them.
#[derive(Debug)]
pub struct Acquired {
    pub provider: String,
    pub items: Vec<CanonicalItem>,
    pub complete: bool,
}

#[derive(Default)]
pub struct ProviderChain {
    providers: Vec<Box<dyn CompendiumProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Box<dyn CompendiumProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn acquire(&self) -> Result<Acquired, AcquisitionError> {
        let mut attempts = Vec::new();

        for (rank, provider) in self.providers.iter().enumerate() {
            let span = info_span!("acquire", provider = provider.name());
            let _enter = span.enter();

            let result = provider.try_acquire().and_then(|fetched| {
                if fetched.items.is_empty() {
                    Err(ProviderError::Empty("provider returned no items".to_string()))
                } else {
                    Ok(fetched)
                }
            });

            match result {
                Ok(Fetched { items, complete }) => {
                    ::metrics::counter!("converter_acquisition_attempts_total", "provider" => provider.name().to_string(), "outcome" => "success").increment(1);
                    info!(items = items.len(), complete, "compendium acquired");

                    if provider.is_origin() {
                        if complete {
                            for earlier in &self.providers[..rank] {
                                if let Err(e) = earlier.store(&items) {
                                    warn!(target_provider = earlier.name(), error = %e, "failed to store acquired compendium");
                                }
                            }
                        } else {
                            warn!("partial compendium used for this run only; not written back");
                        }
                    }
                    return Ok(Acquired {
                        provider: provider.name().to_string(),
                        items,
                        complete,
                    });
                }
                Err(e) => {
                    ::metrics::counter!("converter_acquisition_attempts_total", "provider" => provider.name().to_string(), "outcome" => "failure").increment(1);
                    match &e {
                        ProviderError::Unavailable(_) => info!(reason = %e, "source skipped"),
                        _ => warn!(error = %e, "source failed"),
                    }
                    attempts.push((provider.name().to_string(), e));
                }
            }
        }

        Err(AcquisitionError { attempts })
    }
}

/// Per-run overrides on top of configuration.
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    /// `--compendium`: replaces the conventional local directory.
    pub local_hint: Option<PathBuf>,
    /// Ignore the cached snapshot but still refresh it.
    pub refresh_cache: bool,
    /// Leave the remote archive out of the chain.
    pub offline: bool,
}

/// Assemble the standard local → cache → remote chain from configuration.
pub fn build_chain(config: &Config, options: &AcquireOptions) -> ProviderChain {
    let mut chain = ProviderChain::new();

    let local_dir = options
        .local_hint
        .clone()
        .unwrap_or_else(|| config.compendium.local_dir.clone());
    chain = chain.with(Box::new(LocalDirectoryProvider::new(local_dir)));

    let source_ref = config.remote.source_ref();
    if config.cache.enabled {
        match config.cache.resolved_dir() {
            Some(dir) => {
                let cache = CacheProvider::new(&dir, &source_ref, config.cache.max_age_hours);
                let cache = if options.refresh_cache { cache.write_only() } else { cache };
                chain = chain.with(Box::new(cache));
            }
            None => warn!("no cache directory available; cache tier disabled"),
        }
    }

    if config.remote.enabled && !options.offline {
        let timeout = Duration::from_secs(config.remote.timeout_secs);
        match ReqwestHttp::new(timeout, &config.remote.user_agent) {
            Ok(http) => {
                chain = chain.with(Box::new(RemoteArchiveProvider::new(
                    Box::new(http),
                    config.remote.clone(),
                )));
            }
            Err(e) => warn!(error = %e, "failed to build HTTP client; remote tier disabled"),
        }
    }

    chain
}

/// Acquire the compendium using the configured chain.
pub fn acquire(config: &Config, options: &AcquireOptions) -> Result<Acquired, AcquisitionError> {
    build_chain(config, options).acquire()
}
