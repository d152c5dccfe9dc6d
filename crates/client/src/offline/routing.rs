//! Route table for worker-intercepted requests.
//!
//! Routes are tried in registration order and the first whose pattern
//! matches the request path wins. Patterns are unanchored regexes matched
//! against the URL path only; query and fragment never take part.

use super::strategy::{CachingStrategy, strategy_for};
use quire_core::{Error, RouteSettings, StrategyKind};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: Regex,
    pub strategy: Arc<dyn CachingStrategy>,
}

impl Route {
    pub fn new(pattern: &str, strategy: Arc<dyn CachingStrategy>) -> Result<Self, Error> {
        let pattern = Regex::new(pattern).map_err(|e| Error::InvalidPattern(format!("{pattern}: {e}")))?;
        Ok(Self { pattern, strategy })
    }

    pub fn matches(&self, url: &Url) -> bool {
        self.pattern.is_match(url.path())
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile configured routes in order.
    pub fn from_settings(settings: &[RouteSettings], network_timeout: Option<Duration>) -> Result<Self, Error> {
        let mut router = Self::new();
        for route in settings {
            router.register_route(&route.pattern, strategy_for(route.strategy, network_timeout))?;
        }
        Ok(router)
    }

    pub fn register_route(&mut self, pattern: &str, strategy: Arc<dyn CachingStrategy>) -> Result<(), Error> {
        self.routes.push(Route::new(pattern, strategy)?);
        Ok(())
    }

    /// First route matching `url`.
    pub fn find(&self, url: &Url) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(url))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
