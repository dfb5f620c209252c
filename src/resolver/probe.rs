// Content size prober
//
// Reads the declared Content-Length of a remote locator. The request is
// dropped as soon as headers arrive, so the body is never transferred and
// the connection is released (an unread body is not returned to the pool).

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, instrument, warn};

use super::config::ResolverConfig;
use super::errors::ResolveError;
use super::models::ProbedSize;
use super::traits::SizeProber;
use super::utils::build_http_client;

/// Header-only prober over HTTP(S). One attempt per call, no retries.
pub struct HttpSizeProber {
    client: reqwest::Client,
}

impl HttpSizeProber {
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_http_client(config, config.probe_timeout)?,
        })
    }
}

#[async_trait]
impl SizeProber for HttpSizeProber {
    #[instrument(skip(self), level = "debug")]
    async fn probe(&self, locator: &str) -> ProbedSize {
        let response = match self.client.get(locator).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "size probe failed");
                return ProbedSize::unknown();
            }
        };

        let status = response.status();
        let declared = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        drop(response);

        if !status.is_success() {
            warn!(%status, "size probe got non-success status");
            return ProbedSize::unknown();
        }

        match declared {
            Some(bytes) => {
                debug!(bytes, "size probe succeeded");
                ProbedSize::known(bytes)
            }
            None => {
                warn!("size probe: missing or unparseable content-length");
                ProbedSize::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prober() -> HttpSizeProber {
        HttpSizeProber::new(&ResolverConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_reads_content_length() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .expect(1)
            .mount(&server)
            .await;

        let size = prober().probe(&format!("{}/clip.mp4", server.uri())).await;
        assert_eq!(size, ProbedSize::known(4096));
    }

    #[tokio::test]
    async fn test_error_status_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&server)
            .await;

        let size = prober().probe(&format!("{}/missing.mp4", server.uri())).await;
        assert!(size.is_unknown());
    }

    #[tokio::test]
    async fn test_connection_failure_is_unknown() {
        let server = MockServer::start().await;
        let uri = format!("{}/clip.mp4", server.uri());
        drop(server);

        let size = prober().probe(&uri).await;
        assert!(size.is_unknown());
    }

    #[tokio::test]
    async fn test_invalid_locator_is_unknown() {
        let size = prober().probe("not a url").await;
        assert!(size.is_unknown());
    }

    #[tokio::test]
    async fn test_missing_content_length_is_unknown_and_skips_body() {
        // chunked response whose body never finishes
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let config = ResolverConfig::default().with_probe_timeout(Duration::from_secs(10));
        let started = Instant::now();
        let size = HttpSizeProber::new(&config)
            .unwrap()
            .probe(&format!("http://{}/stream.mp4", addr))
            .await;

        assert_eq!(size, ProbedSize::unknown());
        assert!(started.elapsed() < Duration::from_secs(5));
        server.abort();
    }
}
