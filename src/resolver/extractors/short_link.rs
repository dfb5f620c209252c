// Short-link resolver for Pinterest
//
// RawInput -> Canonicalized -> Resolved(video | image) | Failed
//
// Nothing is kept between calls.

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::diagnostics::{diagnose_error, FailureReason};
use crate::resolver::errors::ResolveError;
use crate::resolver::models::{MediaKind, Provider};
use crate::resolver::traits::CommandRunner;
use crate::resolver::utils::first_line;

lazy_static! {
    static ref PIN_ID_RE: Regex = Regex::new(
        r"pinterest\.(?:com|ca|co\.uk|fr|de|es|it|jp|kr|au|ru)/pin/(\d+)"
    )
    .unwrap();
}

/// Marks a streaming-manifest line in the tool output
const MANIFEST_PREFIX: &str = "ytdl:";
const MANIFEST_SEGMENT: &str = "/iht/hls/";
const DIRECT_SEGMENT: &str = "/mc/720p/";
const MANIFEST_EXT: &str = ".m3u8";
const DIRECT_EXT: &str = ".mp4";

/// Direct media locator produced by a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectLocator {
    pub locator: String,
    /// `Video` for rewritten manifests, `Photo` for plain links
    pub kind: MediaKind,
}

/// Canonical page URL, and whether it was built from a pin id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canonical {
    Verified(String),
    /// Expansion result used verbatim
    Unverified(String),
}

impl Canonical {
    pub fn url(&self) -> &str {
        match self {
            Self::Verified(url) | Self::Unverified(url) => url,
        }
    }
}

pub struct ShortLinkResolver {
    runner: Arc<dyn CommandRunner>,
}

impl ShortLinkResolver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Expand `page_url` into a direct locator. Any failure, including a
    /// missing binary or a blocked network, yields `None`.
    #[instrument(skip(self), fields(runner = self.runner.name()))]
    pub async fn resolve(&self, page_url: &str) -> Option<DirectLocator> {
        match self.try_resolve(page_url).await {
            Ok(direct) => {
                debug!(locator = %direct.locator, kind = ?direct.kind, "resolved");
                Some(direct)
            }
            Err(e) => {
                let reason = diagnose_error(&e);
                warn!(error = %e, reason = reason.description(), "short-link resolution failed");
                None
            }
        }
    }

    async fn try_resolve(&self, page_url: &str) -> Result<DirectLocator, ResolveError> {
        let canonical = self.canonicalize(page_url).await?;
        if let Canonical::Unverified(url) = &canonical {
            debug!(%url, "no pin id in expansion, using it verbatim");
        }
        self.extract_direct(canonical.url()).await
    }

    /// Build the canonical pin URL, expanding through the tool only when
    /// the input carries no pin id.
    pub async fn canonicalize(&self, page_url: &str) -> Result<Canonical, ResolveError> {
        if let Some(id) = extract_pin_id(page_url) {
            return Ok(Canonical::Verified(canonical_pin_url(id)));
        }

        let expanded = self.first_output_line(page_url).await?;
        debug!(%expanded, "expanded short link");

        Ok(match extract_pin_id(&expanded) {
            Some(id) => Canonical::Verified(canonical_pin_url(id)),
            None => Canonical::Unverified(expanded),
        })
    }

    /// Ask the tool for the true media locator of a canonical page
    pub async fn extract_direct(&self, canonical_url: &str) -> Result<DirectLocator, ResolveError> {
        let line = self.first_output_line(canonical_url).await?;
        classify_direct_line(&line).ok_or_else(|| ResolveError::ResolverFailure {
            provider: Provider::Pinterest,
            detail: format!("unrecognised locator line: {}", line),
        })
    }

    async fn first_output_line(&self, url: &str) -> Result<String, ResolveError> {
        let stdout = self.runner.run(url).await?;
        first_line(&stdout)
            .map(str::to_string)
            .ok_or_else(|| ResolveError::ResolverFailure {
                provider: Provider::Pinterest,
                detail: FailureReason::EmptyOutput.description().to_string(),
            })
    }
}

pub fn extract_pin_id(url: &str) -> Option<&str> {
    PIN_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn canonical_pin_url(id: &str) -> String {
    format!("https://www.pinterest.com/pin/{}", id)
}

/// Rewrite a CDN manifest locator to its direct-file equivalent
pub fn manifest_to_direct(manifest: &str) -> String {
    manifest
        .replacen(MANIFEST_SEGMENT, DIRECT_SEGMENT, 1)
        .replacen(MANIFEST_EXT, DIRECT_EXT, 1)
}

/// Interpret one line of tool output
pub fn classify_direct_line(line: &str) -> Option<DirectLocator> {
    let line = line.trim();

    if let Some(manifest) = line.strip_prefix(MANIFEST_PREFIX) {
        let manifest = manifest.trim();
        if manifest.is_empty() {
            return None;
        }
        return Some(DirectLocator {
            locator: manifest_to_direct(manifest),
            kind: MediaKind::Video,
        });
    }

    if line.starts_with("http://") || line.starts_with("https://") {
        return Some(DirectLocator {
            locator: line.to_string(),
            kind: MediaKind::Photo,
        });
    }

    None
}
