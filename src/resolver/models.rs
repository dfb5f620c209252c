// Common data models for link resolution

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Supported providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Tiered quality, single item, optional audio track
    TikTok,
    /// Single item or gallery, no tiering
    Instagram,
    /// Resolved through the external short-link tool
    Pinterest,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TikTok => write!(f, "TikTok"),
            Self::Instagram => write!(f, "Instagram"),
            Self::Pinterest => write!(f, "Pinterest"),
        }
    }
}

/// Kind of a deliverable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Photo,
    Audio,
}

impl MediaKind {
    /// Map a provider's free-form `type` field. Anything that is not a
    /// video or an audio track is delivered as a photo.
    pub fn from_provider_type(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "video" => Self::Video,
            "audio" => Self::Audio,
            _ => Self::Photo,
        }
    }
}

/// One deliverable option offered by a provider.
///
/// Fields are private so a candidate cannot change after extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    locator: String,
    kind: MediaKind,
    quality_tag: Option<String>,
}

impl MediaCandidate {
    /// Returns `None` for an empty locator.
    pub fn new(locator: impl Into<String>, kind: MediaKind, quality_tag: Option<String>) -> Option<Self> {
        let locator = locator.into();
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            locator: trimmed.to_string(),
            kind,
            quality_tag: quality_tag.filter(|t| !t.is_empty()),
        })
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn quality_tag(&self) -> Option<&str> {
        self.quality_tag.as_deref()
    }
}

/// Result of measuring a locator's byte length.
///
/// Serialized as `{"bytes": n, "megabytes": m}`, with `m` rounded to one
/// decimal; both are `null` when the size is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProbedSize {
    /// `None` when the measurement failed
    pub bytes: Option<u64>,
}

impl ProbedSize {
    pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

    pub fn known(bytes: u64) -> Self {
        Self { bytes: Some(bytes) }
    }

    pub fn unknown() -> Self {
        Self { bytes: None }
    }

    pub fn is_unknown(&self) -> bool {
        self.bytes.is_none()
    }

    pub fn megabytes(&self) -> Option<f64> {
        self.bytes.map(|b| b as f64 / Self::BYTES_PER_MB)
    }

    /// One-decimal megabytes, or "unknown"
    pub fn display_megabytes(&self) -> String {
        match self.megabytes() {
            Some(mb) => format!("{:.1}", mb),
            None => "unknown".to_string(),
        }
    }

    /// Known and within the ceiling
    pub fn fits(&self, ceiling_bytes: u64) -> bool {
        self.bytes.map_or(false, |b| b <= ceiling_bytes)
    }

    /// Within the ceiling, or unknown (delivery is attempted anyway)
    pub fn acceptable(&self, ceiling_bytes: u64) -> bool {
        self.bytes.map_or(true, |b| b <= ceiling_bytes)
    }
}

impl Serialize for ProbedSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProbedSize", 2)?;
        state.serialize_field("bytes", &self.bytes)?;
        let rounded = self.megabytes().map(|mb| (mb * 10.0).round() / 10.0);
        state.serialize_field("megabytes", &rounded)?;
        state.end()
    }
}

/// Companion audio track attached to a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub locator: String,
    pub size: ProbedSize,
}

/// One entry of a gallery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub locator: String,
    pub kind: MediaKind,
    pub size: ProbedSize,
}

/// Final result handed to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Video {
        locator: String,
        quality_label: Option<String>,
        size: ProbedSize,
        #[serde(skip_serializing_if = "Option::is_none")]
        audio: Option<AudioTrack>,
        /// Higher tier that could not be delivered in-chat
        #[serde(skip_serializing_if = "Option::is_none")]
        fallback_locator: Option<String>,
    },
    Photo {
        locator: String,
        size: ProbedSize,
    },
    MediaGroup {
        items: Vec<GalleryItem>,
        #[serde(skip_serializing_if = "Option::is_none")]
        audio: Option<AudioTrack>,
    },
    TooLarge {
        fallback_locator: String,
    },
    Error {
        message: String,
    },
}

impl DeliveryOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Single-item outcome for a video or photo of the given size
    pub fn single(kind: MediaKind, locator: String, size: ProbedSize) -> Self {
        match kind {
            MediaKind::Video => Self::Video {
                locator,
                quality_label: None,
                size,
                audio: None,
                fallback_locator: None,
            },
            _ => Self::Photo { locator, size },
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Video { .. } => "video",
            Self::Photo { .. } => "photo",
            Self::MediaGroup { .. } => "media_group",
            Self::TooLarge { .. } => "too_large",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this outcome carries something that can be sent in-chat
    pub fn is_deliverable(&self) -> bool {
        matches!(
            self,
            Self::Video { .. } | Self::Photo { .. } | Self::MediaGroup { .. }
        )
    }
}

/// One rung of a provider's quality ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTier {
    /// Provider tag, e.g. "hd_no_watermark"
    pub tag: String,
    /// Label shown to the user, e.g. "4K"
    pub label: String,
}

impl QualityTier {
    pub fn new(tag: &str, label: &str) -> Self {
        Self {
            tag: tag.to_string(),
            label: label.to_string(),
        }
    }
}

/// Caller-visible progress milestones
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Milestone {
    Analyzing(Provider),
    CheckingAudio,
    /// Carries the quality tag of the tier being probed
    CheckingTier(String),
    ProcessingGallery,
    ProcessingImage,
    ProcessingVideo,
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analyzing(Provider::TikTok) => write!(f, "🔍 Fetching video information..."),
            Self::Analyzing(provider) => write!(f, "🔍 Analyzing {} content...", provider),
            Self::CheckingAudio => write!(f, "🎵 Checking audio..."),
            Self::CheckingTier(tag) => match tag.as_str() {
                "hd_no_watermark" => write!(f, "⚡ Checking HD version..."),
                "no_watermark" => write!(f, "📥 Checking regular version..."),
                other => write!(f, "⚡ Checking {} version...", other),
            },
            Self::ProcessingGallery => write!(f, "📷 Processing gallery..."),
            Self::ProcessingImage => write!(f, "📷 Processing image..."),
            Self::ProcessingVideo => write!(f, "🎥 Processing video..."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_rejects_empty_locator() {
        assert!(MediaCandidate::new("", MediaKind::Video, None).is_none());
        assert!(MediaCandidate::new("   ", MediaKind::Photo, None).is_none());

        let c = MediaCandidate::new(" https://cdn/x.mp4 ", MediaKind::Video, Some(String::new()))
            .unwrap();
        assert_eq!(c.locator(), "https://cdn/x.mp4");
        assert_eq!(c.quality_tag(), None);
    }

    #[test]
    fn test_probed_size_policies() {
        let ceiling = 50 * 1024 * 1024;

        let small = ProbedSize::known(5 * 1024 * 1024);
        assert!(small.fits(ceiling));
        assert!(small.acceptable(ceiling));
        assert_eq!(small.display_megabytes(), "5.0");

        let edge = ProbedSize::known(ceiling);
        assert!(edge.fits(ceiling));

        let big = ProbedSize::known(ceiling + 1);
        assert!(!big.fits(ceiling));
        assert!(!big.acceptable(ceiling));

        let unknown = ProbedSize::unknown();
        assert!(!unknown.fits(ceiling));
        assert!(unknown.acceptable(ceiling));
        assert_eq!(unknown.display_megabytes(), "unknown");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(MediaKind::from_provider_type("video"), MediaKind::Video);
        assert_eq!(MediaKind::from_provider_type("Audio"), MediaKind::Audio);
        assert_eq!(MediaKind::from_provider_type("image"), MediaKind::Photo);
        assert_eq!(MediaKind::from_provider_type(""), MediaKind::Photo);
    }

    #[test]
    fn test_outcome_serializes_with_type_tag() {
        let outcome = DeliveryOutcome::TooLarge {
            fallback_locator: "https://cdn/hd.mp4".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["type"], "too_large");
        assert_eq!(json["fallback_locator"], "https://cdn/hd.mp4");
        assert!(!outcome.is_deliverable());

        let group = DeliveryOutcome::MediaGroup {
            items: vec![],
            audio: None,
        };
        assert_eq!(serde_json::to_value(&group).unwrap()["type"], "media_group");
    }

    #[test]
    fn test_sizes_serialize_with_megabytes() {
        let photo = DeliveryOutcome::Photo {
            locator: "https://cdn/p.jpg".to_string(),
            size: ProbedSize::known(5 * 1024 * 1024 + 300 * 1024),
        };
        let json = serde_json::to_value(&photo).unwrap();
        assert_eq!(json["size"]["bytes"], 5_550_080);
        assert_eq!(json["size"]["megabytes"], 5.3);

        let unknown = serde_json::to_value(ProbedSize::unknown()).unwrap();
        assert!(unknown["bytes"].is_null());
        assert!(unknown["megabytes"].is_null());

        let back: ProbedSize = serde_json::from_value(json["size"].clone()).unwrap();
        assert_eq!(back, ProbedSize::known(5_550_080));
    }

    #[test]
    fn test_milestone_text() {
        assert_eq!(
            Milestone::Analyzing(Provider::Pinterest).to_string(),
            "🔍 Analyzing Pinterest content..."
        );
        assert_eq!(
            Milestone::CheckingTier("hd_no_watermark".to_string()).to_string(),
            "⚡ Checking HD version..."
        );
        assert_eq!(
            Milestone::CheckingTier("no_watermark".to_string()).to_string(),
            "📥 Checking regular version..."
        );
    }
}
