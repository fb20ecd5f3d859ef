//! Fetches pack sources from the system repository on GitHub.
//!
//! One request for the repository tarball at the configured reference, then
//! the `.json` entries under the packs path are read straight out of the
//! gzip stream. Unauthenticated API access is rate limited; an exhausted
//! limit surfaces as `ProviderError::RateLimited` so the caller can retry
//! later.

use std::io::Read;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info, warn};

use super::http::{HttpClientPort, HttpGetResult};
use super::{CompendiumProvider, Fetched};
use crate::compendium::item::items_from_json;
use crate::config::RemoteConfig;
use crate::constants::{GITHUB_API_BASE, REMOTE_PROVIDER};
use crate::error::ProviderError;

pub struct RemoteArchiveProvider {
    http: Box<dyn HttpClientPort>,
    config: RemoteConfig,
    api_base: String,
}

/// Item files read out of an archive, in path order.
#[derive(Debug, Default)]
struct Unpacked {
    files: Vec<(String, String)>,
    /// Set when the stream broke off before the end of the archive.
    interrupted: Option<String>,
}

impl RemoteArchiveProvider {
    pub fn new(http: Box<dyn HttpClientPort>, config: RemoteConfig) -> Self {
        Self {
            http,
            config,
            api_base: GITHUB_API_BASE.to_string(),
        }
    }

    /// Point at a different API host (mirrors, tests).
    pub fn with_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn archive_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/tarball/{}",
            self.api_base, self.config.owner, self.config.repo, self.config.git_ref
        )
    }

    fn packs_prefix(&self) -> String {
        format!("{}/", self.config.packs_path.trim_matches('/'))
    }

    /// Path inside the repository: archive entries sit under one
    /// `<owner>-<repo>-<sha>/` directory.
    fn repo_path(entry_path: &str) -> Option<&str> {
        entry_path.split_once('/').map(|(_, rest)| rest)
    }

    /// Pack name: first path component beneath the packs directory.
    fn collection_for(&self, path: &str) -> String {
        path.strip_prefix(&self.packs_prefix())
            .and_then(|rest| rest.split('/').next())
            .unwrap_or_default()
            .to_string()
    }

    fn unpack(&self, bytes: &[u8]) -> Result<Unpacked, ProviderError> {
        let prefix = self.packs_prefix();
        let mut archive = Archive::new(GzDecoder::new(bytes));
        let entries = archive
            .entries()
            .map_err(|e| ProviderError::Corrupt(format!("repository archive unreadable: {}", e)))?;

        let mut unpacked = Unpacked::default();
        for entry in entries {
            let mut entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    unpacked.interrupted = Some(e.to_string());
                    break;
                }
            };
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = match entry.path() {
                Ok(path) => path.to_string_lossy().into_owned(),
                Err(_) => continue,
            };
            let repo_path = match Self::repo_path(&path) {
                Some(p) if p.starts_with(&prefix) && p.ends_with(".json") => p.to_string(),
                _ => continue,
            };

            let expected = entry.size();
            let mut raw = Vec::new();
            if let Err(e) = entry.read_to_end(&mut raw) {
                unpacked.interrupted = Some(format!("{}: {}", repo_path, e));
                break;
            }
            if raw.len() as u64 != expected {
                unpacked.interrupted = Some(format!(
                    "{}: {} of {} bytes",
                    repo_path,
                    raw.len(),
                    expected
                ));
                break;
            }
            unpacked
                .files
                .push((repo_path, String::from_utf8_lossy(&raw).into_owned()));
        }

        // A cut-off gzip stream only shows up once its trailer is read
        if unpacked.interrupted.is_none() {
            let mut rest = Vec::new();
            if let Err(e) = archive.into_inner().read_to_end(&mut rest) {
                unpacked.interrupted = Some(e.to_string());
            }
        }

        unpacked.files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(unpacked)
    }
}

fn check_status(resp: HttpGetResult, url: &str) -> Result<HttpGetResult, ProviderError> {
    match resp.status {
        200..=299 => Ok(resp),
        403 | 429 if resp.status == 429 || resp.rate_limit_remaining == Some(0) => {
            let reset_at = resp
                .rate_limit_reset
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
            Err(ProviderError::RateLimited { reset_at })
        }
        status => Err(ProviderError::Status {
            status,
            url: url.to_string(),
        }),
    }
}

impl CompendiumProvider for RemoteArchiveProvider {
    fn name(&self) -> &str {
        REMOTE_PROVIDER
    }

    fn is_origin(&self) -> bool {
        true
    }

    fn try_acquire(&self) -> Result<Fetched, ProviderError> {
        let url = self.archive_url();
        info!(source = %self.config.source_ref(), "downloading repository archive");
        let resp = self.http.get(&url).map_err(ProviderError::Http)?;
        let resp = check_status(resp, &url)?;

        let unpacked = self.unpack(&resp.bytes)?;
        if let Some(reason) = &unpacked.interrupted {
            warn!(
                files = unpacked.files.len(),
                error = %reason,
                "repository archive ended early; compendium is partial"
            );
        }
        if unpacked.files.is_empty() {
            return Err(match unpacked.interrupted {
                Some(reason) => ProviderError::Corrupt(format!("repository archive unreadable: {}", reason)),
                None => ProviderError::Empty(format!(
                    "no item files under {} in {}",
                    self.packs_prefix(),
                    self.config.source_ref()
                )),
            });
        }

        let mut items = Vec::new();
        for (path, text) in &unpacked.files {
            match items_from_json(text, &self.collection_for(path), path) {
                Ok(parsed) => {
                    debug!(file = %path, items = parsed.len(), "parsed archive item file");
                    items.extend(parsed);
                }
                Err(e) => warn!(file = %path, error = %e, "skipping unparsable archive item file"),
            }
        }
        info!(files = unpacked.files.len(), items = items.len(), "repository archive unpacked");

        if items.is_empty() {
            return Err(ProviderError::Empty(format!(
                "{} files unpacked but none held items",
                unpacked.files.len()
            )));
        }
        if unpacked.interrupted.is_some() {
            return Ok(Fetched::partial(items));
        }
        Ok(Fetched::complete(items))
    }
}
