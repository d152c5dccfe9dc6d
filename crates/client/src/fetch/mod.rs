//! HTTP fetch pipeline used by pages and worker strategies.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable)
//!
//! Any HTTP status is returned to the caller; deciding what is cacheable is
//! the strategies' job.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use quire_core::{Error, StoredResponse};
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonical, canonicalize, resolve, scope_of};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "quire/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "quire/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &quire_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Only plain 200 responses go into a cache.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
    }

    fn header_str(&self, name: header::HeaderName) -> Option<String> {
        self.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
    }

    /// Convert into a cache row for `cache_name`, keyed by the request URL.
    pub fn to_stored(&self, cache_name: &str, request_url: &Url) -> StoredResponse {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str(), v)))
            .collect();

        StoredResponse {
            content_type: self.content_type.clone(),
            headers_json: serde_json::to_string(&headers).ok(),
            etag: self.header_str(header::ETAG),
            last_modified: self.header_str(header::LAST_MODIFIED),
            ..StoredResponse::new(cache_name, request_url.as_str(), self.status.as_u16(), self.bytes.to_vec())
        }
    }
}

/// Network capability used by worker strategies.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` from the network.
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client with size and redirect limits.
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

    async fn fetch_url(&self, url: Url) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self.http.get(url.as_str()).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{url}: {e}"))
            } else {
                Error::HttpError(format!("network error: {}", e))
            }
        })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{url}: {e}"))
            } else {
                Error::HttpError(format!("failed to read response: {}", e))
            }
        })?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, final_url, status, content_type, bytes, headers, fetch_ms })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        let url = canonical(url.clone()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        self.fetch_url(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusCode) -> FetchResponse {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ETAG, header::HeaderValue::from_static("\"v1\""));
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/css"));
        FetchResponse {
            url: Url::parse("https://example.com/reader.css").unwrap(),
            final_url: Url::parse("https://example.com/reader.css").unwrap(),
            status,
            content_type: Some("text/css".to_string()),
            bytes: Bytes::from_static(b"p { margin: 0 }"),
            headers,
            fetch_ms: 12,
        }
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "quire/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = quire_core::AppConfig { user_agent: "reader/2".into(), timeout_ms: 500, ..Default::default() };
        let config = FetchConfig::from_app_config(&app);
        assert_eq!(config.user_agent, "reader/2");
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_only_ok_is_cacheable() {
        assert!(response(StatusCode::OK).is_cacheable());
        assert!(!response(StatusCode::NOT_FOUND).is_cacheable());
        assert!(!response(StatusCode::PARTIAL_CONTENT).is_cacheable());
    }

    #[test]
    fn test_to_stored_copies_validators() {
        let request = Url::parse("https://example.com/reader.css").unwrap();
        let stored = response(StatusCode::OK).to_stored("book", &request);
        assert_eq!(stored.url, "https://example.com/reader.css");
        assert_eq!(stored.cache_name, "book");
        assert_eq!(stored.status, 200);
        assert_eq!(stored.etag.as_deref(), Some("\"v1\""));
        assert_eq!(stored.content_type.as_deref(), Some("text/css"));
        assert!(stored.headers_json.unwrap().contains("etag"));
        assert_eq!(stored.body, b"p { margin: 0 }");
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse("ftp://example.com/book.epub").unwrap();
        let result = client.fetch(&url).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
