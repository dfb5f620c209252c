// Outcome normalizer - per-provider orchestration
//
// TikTok:    tiered video ladder + optional audio track
// Instagram: gallery or single item, no tiering
// Pinterest: short-link resolver, single item
//
// Every failure, including a panic inside a collaborator, ends up as
// `DeliveryOutcome::Error`; nothing escapes `resolve_outcome`.

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::autolink::{AutolinkClient, AutolinkPayload};
use super::config::ResolverConfig;
use super::errors::{ResolveError, Result};
use super::extractors::{GalleryDlRunner, ShortLinkResolver};
use super::format_selector::{FormatSelector, Selection};
use super::models::{
    AudioTrack, DeliveryOutcome, GalleryItem, MediaCandidate, MediaKind, Milestone, ProbedSize,
    Provider,
};
use super::probe::HttpSizeProber;
use super::traits::{CommandRunner, ProgressSink, SizeProber};
use crate::detect::DetectedLink;

/// What the caller hands over for one request
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// JSON body from the autolink API (TikTok, Instagram)
    Api(serde_json::Value),
    /// Page or short-link URL (Pinterest)
    PageUrl(String),
}

/// Forwards milestones to an optional sink, swallowing its failures
struct Progress<'a> {
    sink: Option<&'a dyn ProgressSink>,
}

impl Progress<'_> {
    fn emit(&self, milestone: Milestone) {
        let Some(sink) = self.sink else {
            return;
        };
        match std::panic::catch_unwind(AssertUnwindSafe(|| sink.update(&milestone))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(status = %milestone, error = %e, "progress update failed"),
            Err(_) => warn!(status = %milestone, "progress sink panicked"),
        }
    }
}

/// Resolves provider payloads into `DeliveryOutcome`s
pub struct MediaResolver {
    config: Arc<ResolverConfig>,
    prober: Arc<dyn SizeProber>,
    short_links: ShortLinkResolver,
    autolink: Option<AutolinkClient>,
}

impl MediaResolver {
    /// Resolver wired to the real HTTP prober, gallery-dl and autolink API
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let prober = Arc::new(HttpSizeProber::new(&config)?);
        let runner = Arc::new(GalleryDlRunner::new(&config));
        let autolink = AutolinkClient::new(&config)?;

        let mut resolver = Self::with_components(config, prober, runner);
        resolver.autolink = Some(autolink);
        Ok(resolver)
    }

    /// Resolver over caller-supplied collaborators. `resolve_link` is not
    /// available for TikTok/Instagram until an autolink client is attached.
    pub fn with_components(
        config: ResolverConfig,
        prober: Arc<dyn SizeProber>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            prober,
            short_links: ShortLinkResolver::new(runner),
            autolink: None,
        }
    }

    /// Attach the API client used by `resolve_link` for TikTok/Instagram
    pub fn with_autolink(mut self, client: AutolinkClient) -> Self {
        self.autolink = Some(client);
        self
    }

    /// Normalize one provider payload into a delivery outcome
    #[instrument(skip(self, payload, sink))]
    pub async fn resolve_outcome(
        &self,
        provider: Provider,
        payload: RawPayload,
        sink: Option<&dyn ProgressSink>,
    ) -> DeliveryOutcome {
        let progress = Progress { sink };
        progress.emit(Milestone::Analyzing(provider));

        self.guarded(provider, self.normalize(provider, payload, &progress))
            .await
    }

    /// Fetch (or pass through) the payload for a detected link, then
    /// normalize it
    #[instrument(skip(self, sink), fields(platform = %link.platform))]
    pub async fn resolve_link(
        &self,
        link: &DetectedLink,
        sink: Option<&dyn ProgressSink>,
    ) -> DeliveryOutcome {
        let progress = Progress { sink };
        let provider = link.platform;
        progress.emit(Milestone::Analyzing(provider));

        let work = async {
            let payload = match provider {
                Provider::Pinterest => RawPayload::PageUrl(link.url.clone()),
                Provider::TikTok | Provider::Instagram => {
                    let client = self.autolink.as_ref().ok_or_else(|| {
                        ResolveError::Unexpected("autolink client not configured".to_string())
                    })?;
                    RawPayload::Api(client.fetch(provider, &link.url).await?)
                }
            };
            self.normalize(provider, payload, &progress).await
        };

        self.guarded(provider, work).await
    }

    /// Run `work`, turning errors and panics into the error outcome
    async fn guarded<F>(&self, provider: Provider, work: F) -> DeliveryOutcome
    where
        F: Future<Output = Result<DeliveryOutcome>>,
    {
        let outcome = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                if e.is_external() {
                    warn!(%provider, error = %e, "resolution failed");
                } else {
                    error!(%provider, error = %e, "resolution failed");
                }
                DeliveryOutcome::error(e.user_message(provider))
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panic".to_string());
                error!(%provider, %detail, "resolution panicked");
                DeliveryOutcome::error(ResolveError::Unexpected(detail).user_message(provider))
            }
        };

        info!(%provider, outcome = outcome.kind_name(), "resolution finished");
        outcome
    }

    async fn normalize(
        &self,
        provider: Provider,
        payload: RawPayload,
        progress: &Progress<'_>,
    ) -> Result<DeliveryOutcome> {
        match (provider, payload) {
            (Provider::TikTok, RawPayload::Api(value)) => {
                let payload = AutolinkPayload::from_value(&value)?;
                self.resolve_tiered(payload, progress).await
            }
            (Provider::Instagram, RawPayload::Api(value)) => {
                let payload = AutolinkPayload::from_value(&value)?;
                self.resolve_untiered(payload, progress).await
            }
            (Provider::Pinterest, RawPayload::PageUrl(url)) => {
                self.resolve_short_link(&url, progress).await
            }
            (provider, payload) => Err(ResolveError::MalformedPayload(format!(
                "{} cannot take a {} payload",
                provider,
                match payload {
                    RawPayload::Api(_) => "JSON",
                    RawPayload::PageUrl(_) => "URL",
                }
            ))),
        }
    }

    /// TikTok: quality ladder with an optional companion audio track
    async fn resolve_tiered(
        &self,
        payload: AutolinkPayload,
        progress: &Progress<'_>,
    ) -> Result<DeliveryOutcome> {
        let preference = self.config.preference_order(Provider::TikTok);
        if FormatSelector::allowed(&payload.candidates, MediaKind::Video, preference).is_empty() {
            return Err(ResolveError::NoCandidates(Provider::TikTok));
        }

        let audio = match payload.audio() {
            Some(track) => {
                progress.emit(Milestone::CheckingAudio);
                self.probe_audio(track).await
            }
            None => None,
        };

        let selector = FormatSelector::new(self.prober.as_ref(), self.config.size_ceiling_bytes());
        let on_tier = |m: Milestone| progress.emit(m);
        let selection = selector
            .select(&payload.candidates, MediaKind::Video, preference, &on_tier)
            .await;

        match selection {
            Selection::Selected {
                candidate,
                tier,
                size,
                fallback_locator,
            } => Ok(DeliveryOutcome::Video {
                locator: candidate.locator().to_string(),
                quality_label: Some(tier.label),
                size,
                audio,
                fallback_locator,
            }),
            Selection::TooLarge { fallback_locator } => {
                Ok(DeliveryOutcome::TooLarge { fallback_locator })
            }
            Selection::NoCandidates => Err(ResolveError::NoCandidates(Provider::TikTok)),
        }
    }

    /// Attach audio only when it is measured and fits
    async fn probe_audio(&self, track: &MediaCandidate) -> Option<AudioTrack> {
        let size = self.prober.probe(track.locator()).await;
        if size.fits(self.config.size_ceiling_bytes()) {
            Some(AudioTrack {
                locator: track.locator().to_string(),
                size,
            })
        } else {
            debug!(size = %size.display_megabytes(), "audio track omitted");
            None
        }
    }

    /// Instagram: gallery when declared, else exactly one item
    async fn resolve_untiered(
        &self,
        payload: AutolinkPayload,
        progress: &Progress<'_>,
    ) -> Result<DeliveryOutcome> {
        if payload.is_multiple && payload.candidates.len() > 1 {
            progress.emit(Milestone::ProcessingGallery);
            let items = self.assemble_gallery(&payload.candidates).await;
            if !items.is_empty() {
                return Ok(DeliveryOutcome::MediaGroup { items, audio: None });
            }
            debug!("no gallery item fits, falling through");
        }

        match payload.candidates.as_slice() {
            [single] => {
                let kind = deliverable_kind(single.kind());
                progress.emit(processing_milestone(kind));
                Ok(self.deliver_single(kind, single.locator().to_string()).await)
            }
            _ => Err(ResolveError::NoCandidates(Provider::Instagram)),
        }
    }

    /// Probe every item concurrently and keep the ones that fit, in
    /// payload order
    async fn assemble_gallery(&self, candidates: &[MediaCandidate]) -> Vec<GalleryItem> {
        let ceiling = self.config.size_ceiling_bytes();
        let prober = self.prober.as_ref();

        let mut pending: FuturesUnordered<_> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| async move {
                (index, prober.probe(candidate.locator()).await)
            })
            .collect();

        let mut probed: Vec<(usize, ProbedSize)> = Vec::with_capacity(candidates.len());
        while let Some(result) = pending.next().await {
            probed.push(result);
        }
        probed.sort_by_key(|(index, _)| *index);

        probed
            .into_iter()
            .filter_map(|(index, size)| {
                let candidate = &candidates[index];
                if size.fits(ceiling) {
                    Some(GalleryItem {
                        locator: candidate.locator().to_string(),
                        kind: deliverable_kind(candidate.kind()),
                        size,
                    })
                } else {
                    debug!(index, size = %size.display_megabytes(), "gallery item dropped");
                    None
                }
            })
            .collect()
    }

    /// Pinterest: short-link resolution, then the single-item policy
    async fn resolve_short_link(
        &self,
        page_url: &str,
        progress: &Progress<'_>,
    ) -> Result<DeliveryOutcome> {
        let direct = self
            .short_links
            .resolve(page_url)
            .await
            .ok_or_else(|| ResolveError::ResolverFailure {
                provider: Provider::Pinterest,
                detail: "short-link resolution failed".to_string(),
            })?;

        let kind = deliverable_kind(direct.kind);
        progress.emit(processing_milestone(kind));
        Ok(self.deliver_single(kind, direct.locator).await)
    }

    /// Fits -> deliver, over -> too large, unknown -> deliver anyway
    async fn deliver_single(&self, kind: MediaKind, locator: String) -> DeliveryOutcome {
        let size = self.prober.probe(&locator).await;
        if size.acceptable(self.config.size_ceiling_bytes()) {
            DeliveryOutcome::single(kind, locator, size)
        } else {
            DeliveryOutcome::TooLarge {
                fallback_locator: locator,
            }
        }
    }
}

fn deliverable_kind(kind: MediaKind) -> MediaKind {
    match kind {
        MediaKind::Video => MediaKind::Video,
        _ => MediaKind::Photo,
    }
}

fn processing_milestone(kind: MediaKind) -> Milestone {
    match kind {
        MediaKind::Video => Milestone::ProcessingVideo,
        _ => Milestone::ProcessingImage,
    }
}
