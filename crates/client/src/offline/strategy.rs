//! Caching strategies.
//!
//! Each strategy decides how a request is resolved between the worker's
//! cache and the network:
//!
//! - **network-first**: network, falling back to the cache when the network
//!   fails (or, with a timeout, is too slow and a copy exists; the fetch then
//!   keeps running and still refreshes the cache)
//! - **cache-first**: cache, falling back to the network on a miss
//! - **stale-while-revalidate**: cache immediately while refreshing it in the
//!   background; network on a miss
//!
//! Only 200 responses are written. Cache read failures count as misses and
//! cache write failures never fail the request; both are logged.

use crate::fetch::{FetchResponse, Fetcher};
use async_trait::async_trait;
use bytes::Bytes;
use quire_core::{CacheDb, Error, StoredResponse, StrategyKind};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Network => "network",
        }
    }
}

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct RouteResponse {
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl RouteResponse {
    pub fn from_fetch(response: &FetchResponse) -> Self {
        Self {
            url: response.final_url.clone(),
            status: response.status.as_u16(),
            content_type: response.content_type.clone(),
            body: response.bytes.clone(),
            source: ResponseSource::Network,
        }
    }

    pub fn from_stored(url: &Url, stored: StoredResponse) -> Self {
        Self {
            url: url.clone(),
            status: stored.status,
            content_type: stored.content_type,
            body: Bytes::from(stored.body),
            source: ResponseSource::Cache,
        }
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Result of running a strategy.
#[derive(Debug)]
pub struct StrategyOutcome {
    pub response: RouteResponse,
    /// Background cache refresh: the stale-while-revalidate fetch, or the
    /// network-first fetch still running after its timeout.
    pub revalidation: Option<JoinHandle<()>>,
}

impl StrategyOutcome {
    pub fn ready(response: RouteResponse) -> Self {
        Self { response, revalidation: None }
    }
}

/// The cache and network a strategy works against.
#[derive(Clone)]
pub struct StrategyContext {
    pub cache: CacheDb,
    pub fetcher: Arc<dyn Fetcher>,
    pub cache_name: String,
    pub max_entries: Option<usize>,
}

impl StrategyContext {
    /// Cached copy of `url`; read failures are treated as a miss.
    pub async fn cached(&self, url: &Url) -> Option<RouteResponse> {
        match self.cache.match_response(&self.cache_name, url.as_str()).await {
            Ok(found) => found.map(|stored| RouteResponse::from_stored(url, stored)),
            Err(e) => {
                tracing::warn!(%url, cache = %self.cache_name, "cache read failed: {e}");
                None
            }
        }
    }

    async fn store(&self, url: &Url, response: &FetchResponse) {
        if !response.is_cacheable() {
            tracing::debug!(%url, status = response.status.as_u16(), "not caching response");
            return;
        }

        if let Err(e) = self.cache.put_response(&response.to_stored(&self.cache_name, url)).await {
            tracing::warn!(%url, cache = %self.cache_name, "cache write failed: {e}");
            return;
        }

        if let Some(max) = self.max_entries {
            match self.cache.purge_lru(Some(&self.cache_name), max).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!(cache = %self.cache_name, evicted = n, "trimmed cache"),
                Err(e) => tracing::warn!(cache = %self.cache_name, "cache trim failed: {e}"),
            }
        }
    }

    /// Fetch from the network and write the response to the cache.
    pub async fn fetch_and_cache(&self, url: &Url) -> Result<RouteResponse, Error> {
        let response = self.fetcher.fetch(url).await?;
        self.store(url, &response).await;
        Ok(RouteResponse::from_fetch(&response))
    }
}

/// A way of resolving a request between cache and network.
#[async_trait]
pub trait CachingStrategy: Send + Sync + fmt::Debug {
    fn kind(&self) -> StrategyKind;

    async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<StrategyOutcome, Error>;
}

/// Build the strategy for `kind`.
pub fn strategy_for(kind: StrategyKind, network_timeout: Option<Duration>) -> Arc<dyn CachingStrategy> {
    match kind {
        StrategyKind::NetworkFirst => Arc::new(NetworkFirst { network_timeout }),
        StrategyKind::CacheFirst => Arc::new(CacheFirst),
        StrategyKind::StaleWhileRevalidate => Arc::new(StaleWhileRevalidate),
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkFirst {
    pub network_timeout: Option<Duration>,
}

impl NetworkFirst {
    async fn settle(
        ctx: &StrategyContext, url: &Url, result: Result<RouteResponse, Error>,
    ) -> Result<StrategyOutcome, Error> {
        match result {
            Ok(response) => Ok(StrategyOutcome::ready(response)),
            Err(e) => match ctx.cached(url).await {
                Some(cached) => {
                    tracing::debug!(%url, "network failed, serving cached copy: {e}");
                    Ok(StrategyOutcome::ready(cached))
                }
                None => Err(e),
            },
        }
    }
}

#[async_trait]
impl CachingStrategy for NetworkFirst {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NetworkFirst
    }

    async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<StrategyOutcome, Error> {
        let Some(timeout) = self.network_timeout else {
            let result = ctx.fetch_and_cache(url).await;
            return Self::settle(ctx, url, result).await;
        };

        // Owned task so the fetch outlives a timed-out request.
        let network_ctx = ctx.clone();
        let network_url = url.clone();
        let mut network = tokio::spawn(async move { network_ctx.fetch_and_cache(&network_url).await });

        tokio::select! {
            joined = &mut network => return Self::settle(ctx, url, flatten(joined)).await,
            _ = tokio::time::sleep(timeout) => {}
        }

        if let Some(cached) = ctx.cached(url).await {
            tracing::debug!(%url, ?timeout, "network slow, serving cached copy");
            let refresh_url = url.clone();
            let revalidation = tokio::spawn(async move {
                if let Err(e) = flatten(network.await) {
                    tracing::warn!(url = %refresh_url, "background fetch failed: {e}");
                }
            });
            return Ok(StrategyOutcome { response: cached, revalidation: Some(revalidation) });
        }

        let result = flatten(network.await);
        Self::settle(ctx, url, result).await
    }
}

fn flatten(joined: Result<Result<RouteResponse, Error>, tokio::task::JoinError>) -> Result<RouteResponse, Error> {
    joined.unwrap_or_else(|e| Err(Error::HttpError(format!("network task failed: {e}"))))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheFirst;

#[async_trait]
impl CachingStrategy for CacheFirst {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CacheFirst
    }

    async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<StrategyOutcome, Error> {
        if let Some(cached) = ctx.cached(url).await {
            return Ok(StrategyOutcome::ready(cached));
        }
        ctx.fetch_and_cache(url).await.map(StrategyOutcome::ready)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StaleWhileRevalidate;

#[async_trait]
impl CachingStrategy for StaleWhileRevalidate {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StaleWhileRevalidate
    }

    async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<StrategyOutcome, Error> {
        let Some(cached) = ctx.cached(url).await else {
            return ctx.fetch_and_cache(url).await.map(StrategyOutcome::ready);
        };

        let refresh_ctx = ctx.clone();
        let refresh_url = url.clone();
        let revalidation = tokio::spawn(async move {
            if let Err(e) = refresh_ctx.fetch_and_cache(&refresh_url).await {
                tracing::warn!(url = %refresh_url, "revalidation failed: {e}");
            }
        });

        Ok(StrategyOutcome { response: cached, revalidation: Some(revalidation) })
    }
}
