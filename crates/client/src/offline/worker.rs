//! An installed service worker.
//!
//! A worker controls every URL under its scope. Requests it controls are
//! routed to a caching strategy; requests no route claims go straight to the
//! network and are never cached.

use super::routing::Router;
use super::strategy::{RouteResponse, StrategyContext, StrategyOutcome};
use crate::fetch::{Fetcher, canonical};
use quire_core::{CacheDb, Error, StrategyKind};
use std::sync::Arc;
use url::Url;

pub struct ServiceWorker {
    scope: Url,
    script_url: Url,
    router: Router,
    ctx: StrategyContext,
}

impl ServiceWorker {
    pub fn new(
        script_url: Url, scope: Url, router: Router, cache: CacheDb, fetcher: Arc<dyn Fetcher>,
        max_entries: Option<usize>,
    ) -> Self {
        let ctx = StrategyContext { cache, fetcher, cache_name: cache_name_for(&scope), max_entries };
        Self { scope, script_url, router, ctx }
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn script_url(&self) -> &Url {
        &self.script_url
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn cache_name(&self) -> &str {
        &self.ctx.cache_name
    }

    /// Whether `url` falls under this worker's scope.
    pub fn controls(&self, url: &Url) -> bool {
        url.origin() == self.scope.origin() && url.path().starts_with(self.scope.path())
    }

    /// Strategy that would handle `url`, if any route claims it.
    pub fn strategy_for(&self, url: &Url) -> Option<StrategyKind> {
        self.router.find(url).map(|route| route.kind())
    }

    /// Handle a fetch event for `url`.
    pub async fn handle_fetch(&self, url: &Url) -> Result<StrategyOutcome, Error> {
        let url = canonical(url.clone()).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        match self.router.find(&url) {
            Some(route) => {
                tracing::debug!(%url, strategy = %route.kind(), "routing request");
                route.strategy.handle(&self.ctx, &url).await
            }
            None => {
                let response = self.ctx.fetcher.fetch(&url).await?;
                Ok(StrategyOutcome::ready(RouteResponse::from_fetch(&response)))
            }
        }
    }
}

impl std::fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("scope", &self.scope.as_str())
            .field("script_url", &self.script_url.as_str())
            .field("routes", &self.router.routes().len())
            .finish()
    }
}

/// Name of the runtime cache owned by the worker at `scope`.
pub fn cache_name_for(scope: &Url) -> String {
    format!("runtime:{scope}")
}
