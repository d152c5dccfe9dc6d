use crate::fetch::{FetchResponse, Fetcher};
use async_trait::async_trait;
use bytes::Bytes;
use quire_core::Error;
use reqwest::{StatusCode, header};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

enum Canned {
    Respond { status: u16, content_type: Option<String>, body: String },
    Fail,
}

/// In-memory network with canned responses per URL.
#[derive(Default)]
pub struct FakeFetcher {
    canned: Mutex<HashMap<String, Canned>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.respond_typed(url, status, None, body);
    }

    pub fn respond_typed(&self, url: &str, status: u16, content_type: Option<&str>, body: &str) {
        let canned = Canned::Respond {
            status,
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
        };
        self.canned.lock().unwrap().insert(url.to_string(), canned);
    }

    pub fn fail(&self, url: &str) {
        self.canned.lock().unwrap().insert(url.to_string(), Canned::Fail);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let canned = self.canned.lock().unwrap();
        match canned.get(url.as_str()) {
            Some(Canned::Respond { status, content_type, body }) => {
                let mut headers = header::HeaderMap::new();
                if let Some(ct) = content_type
                    && let Ok(value) = header::HeaderValue::from_str(ct)
                {
                    headers.insert(header::CONTENT_TYPE, value);
                }
                Ok(FetchResponse {
                    url: url.clone(),
                    final_url: url.clone(),
                    status: StatusCode::from_u16(*status).unwrap(),
                    content_type: content_type.clone(),
                    bytes: Bytes::from(body.clone()),
                    headers,
                    fetch_ms: 0,
                })
            }
            Some(Canned::Fail) => Err(Error::HttpError(format!("network error: {url} unreachable"))),
            None => Err(Error::HttpError(format!("network error: no route to {url}"))),
        }
    }
}
