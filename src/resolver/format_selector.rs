// FormatSelector - quality ladder walk under the size ceiling
//
// Candidates are first narrowed to the requested kind and to the tags in
// the provider's ladder; anything else (watermarked copies etc.) is dropped
// outright. The ladder is then walked top-down, probing one candidate per
// tier and stopping at the first acceptable one.

use tracing::debug;

use super::models::{MediaCandidate, MediaKind, Milestone, ProbedSize, QualityTier};
use super::traits::SizeProber;

/// Outcome of one selection
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Selected {
        candidate: MediaCandidate,
        tier: QualityTier,
        size: ProbedSize,
        /// Best tier that was rejected for size, if any
        fallback_locator: Option<String>,
    },
    /// Every tier was over the ceiling
    TooLarge { fallback_locator: String },
    /// Nothing passed the kind/tag filter
    NoCandidates,
}

/// Format selector bound to a prober and a ceiling
pub struct FormatSelector<'a> {
    prober: &'a dyn SizeProber,
    ceiling_bytes: u64,
}

impl<'a> FormatSelector<'a> {
    pub fn new(prober: &'a dyn SizeProber, ceiling_bytes: u64) -> Self {
        Self {
            prober,
            ceiling_bytes,
        }
    }

    /// Candidates of `kind` whose tag appears in `preference`, input order kept
    pub fn allowed<'c>(
        candidates: &'c [MediaCandidate],
        kind: MediaKind,
        preference: &[QualityTier],
    ) -> Vec<&'c MediaCandidate> {
        candidates
            .iter()
            .filter(|c| c.kind() == kind)
            .filter(|c| {
                c.quality_tag()
                    .map_or(false, |tag| preference.iter().any(|t| t.tag == tag))
            })
            .collect()
    }

    /// Walk `preference` from best to worst and pick the first tier whose
    /// candidate is within the ceiling or of unknown size.
    ///
    /// `on_tier` is called before each probe.
    pub async fn select(
        &self,
        candidates: &[MediaCandidate],
        kind: MediaKind,
        preference: &[QualityTier],
        on_tier: &(dyn Fn(Milestone) + Send + Sync),
    ) -> Selection {
        let allowed = Self::allowed(candidates, kind, preference);
        if allowed.is_empty() {
            return Selection::NoCandidates;
        }

        let mut rejected: Option<&MediaCandidate> = None;

        for tier in preference {
            let Some(candidate) = allowed
                .iter()
                .find(|c| c.quality_tag() == Some(tier.tag.as_str()))
            else {
                continue;
            };

            on_tier(Milestone::CheckingTier(tier.tag.clone()));
            let size = self.prober.probe(candidate.locator()).await;

            if size.acceptable(self.ceiling_bytes) {
                debug!(tag = %tier.tag, size = %size.display_megabytes(), "tier selected");
                return Selection::Selected {
                    candidate: (*candidate).clone(),
                    tier: tier.clone(),
                    size,
                    fallback_locator: rejected.map(|c| c.locator().to_string()),
                };
            }

            debug!(tag = %tier.tag, size = %size.display_megabytes(), "tier over ceiling");
            if rejected.is_none() {
                rejected = Some(*candidate);
            }
        }

        // `allowed` is non-empty and every allowed tag is in the ladder,
        // so at least one tier was probed and rejected.
        match rejected {
            Some(best) => Selection::TooLarge {
                fallback_locator: best.locator().to_string(),
            },
            None => Selection::NoCandidates,
        }
    }
}
