// Short-link extraction through an external tool
//
// - gallery_dl: bounded process runner for the tool
// - short_link: pin canonicalization and direct-locator extraction
// - diagnostics: failure classification for logs

mod diagnostics;
mod gallery_dl;
mod short_link;

pub use diagnostics::{diagnose_error, diagnose_failure, FailureReason};
pub use gallery_dl::GalleryDlRunner;
pub use short_link::{
    canonical_pin_url, classify_direct_line, extract_pin_id, manifest_to_direct, Canonical,
    DirectLocator, ShortLinkResolver,
};
