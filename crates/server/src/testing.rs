use async_trait::async_trait;
use bytes::Bytes;
use quire_client::{FetchResponse, Fetcher};
use quire_core::Error;
use reqwest::{StatusCode, header};
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// Serves fixed documents by URL and counts requests per URL.
#[derive(Default)]
pub struct PageFetcher {
    documents: Mutex<HashMap<String, (&'static str, String)>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl PageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: &str, html: &str) {
        self.documents.lock().unwrap().insert(url.to_string(), ("text/html", html.to_string()));
    }

    pub fn script(&self, url: &str) {
        self.documents.lock().unwrap().insert(url.to_string(), ("application/javascript", String::new()));
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for PageFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let documents = self.documents.lock().unwrap();
        let (content_type, body) =
            documents.get(url.as_str()).ok_or_else(|| Error::HttpError(format!("network error: {url} unreachable")))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static(*content_type));

        Ok(FetchResponse {
            url: url.clone(),
            final_url: url.clone(),
            status: StatusCode::OK,
            content_type: Some(content_type.to_string()),
            bytes: Bytes::from(body.clone()),
            headers,
            fetch_ms: 0,
        })
    }
}
