// Platform detection - maps free text to a supported provider and URL

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::resolver::Provider;

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r#"(?i)(https?://[^\s"]+)"#).unwrap();
    static ref TRAILING_RE: Regex = Regex::new(r"[.,;!?)}\]]+$").unwrap();
    static ref PATTERNS: Vec<(Provider, Regex)> = vec![
        (
            Provider::TikTok,
            Regex::new(r#"https://(www\.|vm\.|vt\.)?tiktok\.com/[^\s"]*"#).unwrap(),
        ),
        (
            Provider::Pinterest,
            Regex::new(
                r#"https?://(?:(?:www\.)?pinterest\.(?:com|ca|co\.uk|fr|de|es|it|jp|kr|au|ru)/(?:pin/[\w-]+|\d+)|pin\.it/[\w-]+)[^\s"]*"#
            )
            .unwrap(),
        ),
        (
            Provider::Instagram,
            Regex::new(r"https?://(www\.)?instagram\.com/(p|reel)/[A-Za-z0-9_-]+").unwrap(),
        ),
    ];
}

/// A supported link found in user text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedLink {
    pub platform: Provider,
    /// Cleaned URL, no surrounding whitespace or punctuation
    pub url: String,
}

/// First URL in `text`, or the whole trimmed text when none is found
pub fn extract_url(text: &str) -> &str {
    URL_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or_else(|| text.trim())
}

/// Strip trailing punctuation
pub fn clean_url(url: &str) -> String {
    TRAILING_RE.replace(url, "").trim().to_string()
}

pub fn detect_platform(text: &str) -> Option<DetectedLink> {
    if text.trim().is_empty() {
        return None;
    }

    let cleaned = clean_url(extract_url(text));
    if cleaned.is_empty() {
        return None;
    }

    PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&cleaned))
        .map(|(platform, _)| DetectedLink {
            platform: *platform,
            url: cleaned,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_tiktok_in_text() {
        let link = detect_platform("look at this https://vm.tiktok.com/ZMabc123/ !!").unwrap();
        assert_eq!(link.platform, Provider::TikTok);
        assert_eq!(link.url, "https://vm.tiktok.com/ZMabc123/");
    }

    #[test]
    fn test_strips_trailing_punctuation() {
        let link = detect_platform("(https://www.instagram.com/reel/Cx_1-a).").unwrap();
        assert_eq!(link.platform, Provider::Instagram);
        assert_eq!(link.url, "https://www.instagram.com/reel/Cx_1-a");
    }

    #[test]
    fn test_pinterest_variants() {
        let short = detect_platform("https://pin.it/3xYz").unwrap();
        assert_eq!(short.platform, Provider::Pinterest);

        let regional = detect_platform("https://www.pinterest.co.uk/pin/123456/").unwrap();
        assert_eq!(regional.platform, Provider::Pinterest);
    }

    #[test]
    fn test_unsupported_and_empty() {
        assert_eq!(detect_platform(""), None);
        assert_eq!(detect_platform("hello there"), None);
        assert_eq!(detect_platform("https://example.com/video.mp4"), None);
        // profile pages are not posts
        assert_eq!(detect_platform("https://www.instagram.com/someone"), None);
    }
}
