// Autolink API - external media resolution service
//
// One GET endpoint taking the content URL and an API key; answers with a
// list of media descriptors. Payloads are validated here, before anything
// reaches the selector.

use serde::Deserialize;
use tracing::{debug, instrument};

use super::config::ResolverConfig;
use super::errors::ResolveError;
use super::models::{MediaCandidate, MediaKind, Provider};
use super::utils::build_http_client;

/// Raw descriptor as the API sends it
#[derive(Debug, Clone, Deserialize)]
struct RawMedia {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    quality: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPayload {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    post_type: Option<String>,
    #[serde(default)]
    medias: Option<Vec<RawMedia>>,
}

/// Validated API payload
#[derive(Debug, Clone, PartialEq)]
pub struct AutolinkPayload {
    /// Provider declared several items ("multiple")
    pub is_multiple: bool,
    pub candidates: Vec<MediaCandidate>,
}

impl AutolinkPayload {
    /// Validate a raw JSON payload.
    ///
    /// An explicit `error` field or an empty media list is `ResolveError::Api`;
    /// a payload of the wrong shape is `MalformedPayload`.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ResolveError> {
        if value.is_null() {
            return Err(ResolveError::Api("empty response".to_string()));
        }

        let raw: RawPayload = serde_json::from_value(value.clone())
            .map_err(|e| ResolveError::MalformedPayload(e.to_string()))?;

        if let Some(err) = raw.error.as_ref().filter(|e| is_set(e)) {
            return Err(ResolveError::Api(err.to_string()));
        }

        let medias = raw.medias.unwrap_or_default();
        if medias.is_empty() {
            return Err(ResolveError::Api("no medias in response".to_string()));
        }

        let candidates: Vec<MediaCandidate> = medias
            .into_iter()
            .filter_map(|m| {
                let kind = MediaKind::from_provider_type(m.kind.as_deref().unwrap_or(""));
                MediaCandidate::new(m.url.unwrap_or_default(), kind, m.quality)
            })
            .collect();

        if candidates.is_empty() {
            return Err(ResolveError::Api("no usable locators in response".to_string()));
        }

        Ok(Self {
            is_multiple: raw.post_type.as_deref() == Some("multiple"),
            candidates,
        })
    }

    /// First audio candidate, if any
    pub fn audio(&self) -> Option<&MediaCandidate> {
        self.candidates.iter().find(|c| c.kind() == MediaKind::Audio)
    }
}

// `error: false`, `null`, `0` and `""` mean "no error"
fn is_set(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map_or(true, |v| v != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// HTTP client for the autolink endpoint
pub struct AutolinkClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl AutolinkClient {
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_http_client(config, config.api_timeout)?,
            endpoint: config.autolink_url.clone(),
            api_key: config.autolink_api_key.clone(),
        })
    }

    /// Fetch the raw payload for `url`. Transport faults and non-success
    /// statuses become `ResolverFailure`.
    #[instrument(skip(self))]
    pub async fn fetch(&self, provider: Provider, url: &str) -> Result<serde_json::Value, ResolveError> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .header("Content-Type", "application/json")
            .query(&[("url", url)]);

        if let Some(key) = &self.api_key {
            request = request.header("apikey", key.as_str());
        }

        let response = request.send().await.map_err(|e| ResolveError::ResolverFailure {
            provider,
            detail: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::ResolverFailure {
                provider,
                detail: format!("autolink returned {}", status),
            });
        }

        let value = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ResolveError::ResolverFailure {
                provider,
                detail: e.to_string(),
            })?;
        debug!("autolink payload received");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parses_tiered_payload() {
        let payload = AutolinkPayload::from_value(&json!({
            "type": "single",
            "medias": [
                {"url": "https://cdn/wm.mp4", "type": "video", "quality": "watermark"},
                {"url": "https://cdn/hd.mp4", "type": "video", "quality": "hd_no_watermark"},
                {"url": "https://cdn/a.mp3", "type": "audio"},
            ]
        }))
        .unwrap();

        assert!(!payload.is_multiple);
        assert_eq!(payload.candidates.len(), 3);
        assert_eq!(payload.candidates[1].quality_tag(), Some("hd_no_watermark"));
        assert_eq!(payload.audio().unwrap().locator(), "https://cdn/a.mp3");
    }

    #[test]
    fn test_error_field_and_empty_media_are_api_errors() {
        let err = AutolinkPayload::from_value(&json!({"error": true, "medias": []})).unwrap_err();
        assert!(matches!(err, ResolveError::Api(_)));

        let err = AutolinkPayload::from_value(&json!({"error": "rate limited"})).unwrap_err();
        assert!(matches!(err, ResolveError::Api(_)));

        let err = AutolinkPayload::from_value(&json!({"medias": []})).unwrap_err();
        assert!(matches!(err, ResolveError::Api(_)));

        let err = AutolinkPayload::from_value(&serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, ResolveError::Api(_)));
    }

    #[test]
    fn test_false_error_field_is_ignored() {
        let payload = AutolinkPayload::from_value(&json!({
            "error": false,
            "type": "multiple",
            "medias": [{"url": "https://cdn/1.jpg", "type": "image"}]
        }))
        .unwrap();
        assert!(payload.is_multiple);
        assert_eq!(payload.candidates[0].kind(), MediaKind::Photo);

        let payload = AutolinkPayload::from_value(&json!({
            "error": 0,
            "medias": [{"url": "https://cdn/1.mp4", "type": "video"}]
        }))
        .unwrap();
        assert_eq!(payload.candidates.len(), 1);

        let err = AutolinkPayload::from_value(&json!({
            "error": 429,
            "medias": [{"url": "https://cdn/1.mp4", "type": "video"}]
        }))
        .unwrap_err();
        assert!(matches!(err, ResolveError::Api(_)));
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let err = AutolinkPayload::from_value(&json!({"medias": "nope"})).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedPayload(_)));

        let err = AutolinkPayload::from_value(&json!("just text")).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedPayload(_)));
    }

    #[test]
    fn test_empty_locators_are_dropped() {
        let payload = AutolinkPayload::from_value(&json!({
            "medias": [
                {"url": "", "type": "video"},
                {"type": "video"},
                {"url": "https://cdn/ok.mp4", "type": "video"}
            ]
        }))
        .unwrap();
        assert_eq!(payload.candidates.len(), 1);

        let err = AutolinkPayload::from_value(&json!({"medias": [{"url": ""}]})).unwrap_err();
        assert!(matches!(err, ResolveError::Api(_)));
    }

    #[tokio::test]
    async fn test_fetch_sends_url_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/social/autolink"))
            .and(query_param("url", "https://www.tiktok.com/@u/video/1"))
            .and(header("apikey", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"medias": []})))
            .expect(1)
            .mount(&server)
            .await;

        let config = ResolverConfig::default()
            .with_autolink_url(format!("{}/v1/social/autolink", server.uri()))
            .with_api_key(Some("secret".to_string()));
        let client = AutolinkClient::new(&config).unwrap();

        let value = client
            .fetch(Provider::TikTok, "https://www.tiktok.com/@u/video/1")
            .await
            .unwrap();
        assert_eq!(value, json!({"medias": []}));
    }

    #[tokio::test]
    async fn test_fetch_maps_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = ResolverConfig::default().with_autolink_url(server.uri());
        let client = AutolinkClient::new(&config).unwrap();

        let err = client
            .fetch(Provider::Instagram, "https://www.instagram.com/p/abc")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ResolverFailure { .. }));
    }
}
