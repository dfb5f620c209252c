// Resolver module - turns provider payloads into delivery outcomes
//
// probe -> format_selector -> orchestrator, with extractors feeding the
// Pinterest path and autolink feeding TikTok / Instagram.

pub mod autolink;
pub mod config;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod probe;
pub mod traits;
pub mod utils;

pub use autolink::{AutolinkClient, AutolinkPayload};
pub use config::{ResolverConfig, SIZE_CEILING_BYTES};
pub use errors::ResolveError;
pub use extractors::{DirectLocator, GalleryDlRunner, ShortLinkResolver};
pub use format_selector::{FormatSelector, Selection};
pub use models::{
    AudioTrack, DeliveryOutcome, GalleryItem, MediaCandidate, MediaKind, Milestone, ProbedSize,
    Provider, QualityTier,
};
pub use orchestrator::{MediaResolver, RawPayload};
pub use probe::HttpSizeProber;
pub use traits::{CommandRunner, LogProgress, NoProgress, ProgressSink, SizeProber};
