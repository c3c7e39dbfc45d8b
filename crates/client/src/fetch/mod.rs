//! HTTP fetch pipeline for cache population.
//!
//! The manager never talks to reqwest directly; it goes through the
//! `Fetcher` trait so install and interception can be driven by a scripted
//! implementation in tests.
//!
//! ### Behavior
//! - Non-2xx statuses are not errors here: the gateway passes them through
//!   and the cacheability policy keeps them out of the store.
//! - Redirects are followed up to a limit; the final URL is reported so the
//!   policy can tell a redirected response from a plain one.
//! - Bodies are fully buffered, capped at `max_bytes`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use url::Url;

use larder_core::Error;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "larder/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "larder/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// Response from a fetch operation, fully buffered.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response headers (values that are valid UTF-8 only)
    pub headers: Vec<(String, String)>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// Network access as the cache manager sees it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a GET for the given URL and buffer the response.
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, Error> {
        let start = Instant::now();

        let response = self.http.get(url.as_str()).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", url, e))
            } else {
                Error::HttpError(format!("network error: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let final_url = Url::parse(response.url().as_str()).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes, status {})",
            url,
            final_url,
            fetch_ms,
            bytes.len(),
            status
        );

        Ok(FetchedResponse { url: url.clone(), final_url, status, content_type, headers, bytes, fetch_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "larder/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetched_response_fields() {
        let response = FetchedResponse {
            url: Url::parse("http://localhost:3000/index.html").unwrap(),
            final_url: Url::parse("http://localhost:3000/index.html").unwrap(),
            status: 200,
            content_type: Some("text/html".to_string()),
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            bytes: Bytes::from_static(b"<html></html>"),
            fetch_ms: 12,
        };

        assert_eq!(response.status, 200);
        assert_eq!(response.bytes.len(), 13);
        assert_eq!(response.content_type.as_deref(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let config = FetchConfig::default();
        let client = FetchClient::new(config);
        assert!(client.is_ok());
    }
}
