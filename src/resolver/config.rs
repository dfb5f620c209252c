// Resolver configuration
//
// Built once and shared read-only by every component.

use std::collections::HashMap;
use std::time::Duration;

use super::models::{Provider, QualityTier};

/// 50 MB, the in-chat delivery ceiling
pub const SIZE_CEILING_BYTES: u64 = 50 * 1024 * 1024;

pub const DEFAULT_AUTOLINK_URL: &str = "https://api.zm.io.vn/v1/social/autolink";

/// Immutable configuration injected into the prober, selector, short-link
/// resolver and normalizer.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    size_ceiling_bytes: u64,
    preferences: HashMap<Provider, Vec<QualityTier>>,
    /// Per-probe request timeout
    pub probe_timeout: Duration,
    /// Upper bound for one external resolver process
    pub process_timeout: Duration,
    /// Autolink API request timeout
    pub api_timeout: Duration,
    /// Explicit path to the short-link tool; discovered when `None`
    pub gallery_dl_path: Option<String>,
    pub autolink_url: String,
    pub autolink_api_key: Option<String>,
    /// SOCKS5/HTTP proxy for probes and API calls
    pub proxy: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let mut preferences = HashMap::new();
        preferences.insert(
            Provider::TikTok,
            vec![
                QualityTier::new("hd_no_watermark", "4K"),
                QualityTier::new("no_watermark", "HD"),
            ],
        );

        Self {
            size_ceiling_bytes: SIZE_CEILING_BYTES,
            preferences,
            probe_timeout: Duration::from_secs(15),
            process_timeout: Duration::from_secs(60),
            api_timeout: Duration::from_secs(30),
            gallery_dl_path: None,
            autolink_url: DEFAULT_AUTOLINK_URL.to_string(),
            autolink_api_key: None,
            proxy: None,
        }
    }
}

impl ResolverConfig {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("AUTOLINK_API_URL") {
            if !url.trim().is_empty() {
                config.autolink_url = url.trim().to_string();
            }
        }
        config.autolink_api_key = std::env::var("AUTOLINK_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        config.gallery_dl_path = std::env::var("GALLERY_DL_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty());
        config.proxy = std::env::var("RESOLVER_PROXY")
            .ok()
            .filter(|p| !p.trim().is_empty());

        if let Some(secs) = env_secs("RESOLVER_PROCESS_TIMEOUT_SECS") {
            config.process_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("API_TIMEOUT_SECS") {
            config.api_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("PROBE_TIMEOUT_SECS") {
            config.probe_timeout = Duration::from_secs(secs);
        }

        config
    }

    pub fn size_ceiling_bytes(&self) -> u64 {
        self.size_ceiling_bytes
    }

    /// Quality tiers from most to least preferred. Empty for providers
    /// without tiering.
    pub fn preference_order(&self, provider: Provider) -> &[QualityTier] {
        self.preferences
            .get(&provider)
            .map(|tiers| tiers.as_slice())
            .unwrap_or(&[])
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.autolink_api_key = key;
        self
    }

    pub fn with_autolink_url(mut self, url: impl Into<String>) -> Self {
        self.autolink_url = url.into();
        self
    }

    pub fn with_gallery_dl_path(mut self, path: Option<String>) -> Self {
        self.gallery_dl_path = path;
        self
    }

    pub fn with_process_timeout(mut self, timeout: Duration) -> Self {
        self.process_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }
}

fn env_secs(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}
