//! Worker registration.
//!
//! On page load, if the host offers a service-worker container, the worker
//! script is registered once in a detached task. The page never waits on
//! it and a failure only produces a log line.

use super::routing::Router;
use super::worker::ServiceWorker;
use crate::fetch::{Fetcher, resolve, scope_of};
use async_trait::async_trait;
use quire_core::{CacheDb, Error, OfflineSettings};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use url::Url;

/// Summary of an active registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerRegistration {
    pub scope: String,
    pub script_url: String,
    pub cache_name: String,
    pub routes: Vec<String>,
}

impl From<&ServiceWorker> for WorkerRegistration {
    fn from(worker: &ServiceWorker) -> Self {
        Self {
            scope: worker.scope().to_string(),
            script_url: worker.script_url().to_string(),
            cache_name: worker.cache_name().to_string(),
            routes: worker
                .router()
                .routes()
                .iter()
                .map(|r| format!("{} -> {}", r.pattern.as_str(), r.kind()))
                .collect(),
        }
    }
}

/// Accepts worker registrations.
#[async_trait]
pub trait ServiceWorkerContainer: Send + Sync {
    async fn register(&self, script_url: &Url) -> Result<WorkerRegistration, Error>;
}

/// The environment a page is loaded into.
pub trait WorkerHost {
    /// The worker container, or `None` when the host has no worker support.
    fn service_worker(&self) -> Option<Arc<dyn ServiceWorkerContainer>>;
}

/// A host whose worker support is decided up front.
#[derive(Clone, Default)]
pub struct HostCapabilities {
    pub service_worker: Option<Arc<dyn ServiceWorkerContainer>>,
}

impl HostCapabilities {
    pub fn with_service_worker(container: Arc<dyn ServiceWorkerContainer>) -> Self {
        Self { service_worker: Some(container) }
    }
}

impl WorkerHost for HostCapabilities {
    fn service_worker(&self) -> Option<Arc<dyn ServiceWorkerContainer>> {
        self.service_worker.clone()
    }
}

/// Register `script` (relative to `page_url`) if the host supports workers.
///
/// Returns the handle of the detached registration task, or `None` when
/// nothing was attempted.
pub fn register_on_load(host: &dyn WorkerHost, page_url: &Url, script: &str) -> Option<JoinHandle<()>> {
    let container = host.service_worker()?;

    let script_url = match resolve(page_url, script) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(%page_url, %script, "worker script does not resolve: {e}");
            return None;
        }
    };

    Some(tokio::spawn(async move {
        match container.register(&script_url).await {
            Ok(registration) => {
                tracing::debug!(scope = %registration.scope, script = %script_url, "service worker registered");
            }
            Err(e) => tracing::warn!(script = %script_url, "service worker registration failed: {e}"),
        }
    }))
}

/// In-process worker container backed by the response cache.
pub struct LocalWorkerContainer {
    fetcher: Arc<dyn Fetcher>,
    cache: CacheDb,
    router: Router,
    max_entries: Option<usize>,
    workers: RwLock<BTreeMap<String, Arc<ServiceWorker>>>,
}

impl LocalWorkerContainer {
    /// Compile the configured routes; every worker shares them.
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: CacheDb, settings: &OfflineSettings) -> Result<Self, Error> {
        let router = Router::from_settings(&settings.routes, settings.network_timeout())?;
        Ok(Self { fetcher, cache, router, max_entries: settings.max_entries, workers: RwLock::new(BTreeMap::new()) })
    }

    /// The worker whose scope is the longest prefix of `url`.
    pub async fn controller_for(&self, url: &Url) -> Option<Arc<ServiceWorker>> {
        self.workers
            .read()
            .await
            .values()
            .filter(|worker| worker.controls(url))
            .max_by_key(|worker| worker.scope().as_str().len())
            .cloned()
    }

    pub async fn registrations(&self) -> Vec<WorkerRegistration> {
        self.workers.read().await.values().map(|w| WorkerRegistration::from(w.as_ref())).collect()
    }

    /// Remove the worker registered for `scope`.
    pub async fn unregister(&self, scope: &Url) -> bool {
        self.workers.write().await.remove(scope.as_str()).is_some()
    }

    async fn fetch_script(&self, script_url: &Url) -> Result<(), Error> {
        let response = self
            .fetcher
            .fetch(script_url)
            .await
            .map_err(|e| Error::RegistrationFailed(format!("{script_url}: {e}")))?;

        if !response.status.is_success() {
            return Err(Error::RegistrationFailed(format!(
                "{script_url}: script fetch returned HTTP {}",
                response.status.as_u16()
            )));
        }

        if let Some(content_type) = &response.content_type
            && !is_javascript(content_type)
        {
            return Err(Error::RegistrationFailed(format!(
                "{script_url}: unsupported script MIME type {content_type}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ServiceWorkerContainer for LocalWorkerContainer {
    async fn register(&self, script_url: &Url) -> Result<WorkerRegistration, Error> {
        self.fetch_script(script_url).await?;

        let scope = scope_of(script_url);
        let worker = Arc::new(ServiceWorker::new(
            script_url.clone(),
            scope.clone(),
            self.router.clone(),
            self.cache.clone(),
            self.fetcher.clone(),
            self.max_entries,
        ));
        let registration = WorkerRegistration::from(worker.as_ref());

        if self.workers.write().await.insert(scope.to_string(), worker).is_some() {
            tracing::debug!(%scope, "replaced existing worker");
        }

        Ok(registration)
    }
}

fn is_javascript(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    matches!(essence.as_str(), "text/javascript" | "application/javascript" | "application/x-javascript")
}
