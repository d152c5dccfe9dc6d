//! Reader state and the currently open page.
//!
//! The server holds at most one open page. Navigating replaces it, which
//! drops the old page's key listener subscription with it.

use quire_client::fetch::{canonicalize, resolve};
use quire_client::keynav::{
    ElementInfo, FocusSettings, HtmlPage, Key, KeyEvent, KeyNav, KeyUpListeners, PendingNavigation, Subscription,
    ViewportLog, schedule_fragment_focus,
};
use quire_client::offline::{HostCapabilities, LocalWorkerContainer, RouteResponse, register_on_load};
use quire_client::Fetcher;
use quire_core::{AppConfig, CacheDb, Error};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

/// A navigation link found on the page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NavTarget {
    /// previous, next or table_of_contents.
    pub link: String,
    /// Raw attribute value.
    pub target: String,
}

/// Visual effects of the fragment focus.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FocusReport {
    /// Elements that received the highlight class.
    pub highlighted: Vec<String>,
    /// Elements scrolled into view.
    pub scrolled: Vec<String>,
}

impl From<ViewportLog> for FocusReport {
    fn from(log: ViewportLog) -> Self {
        Self {
            highlighted: log.highlights.iter().map(|h| describe(&h.element)).collect(),
            scrolled: log.scrolls.iter().map(|s| describe(&s.element)).collect(),
        }
    }
}

fn describe(element: &ElementInfo) -> String {
    match &element.id {
        Some(id) => format!("{}#{}", element.tag, id),
        None => format!("{}[{}]", element.tag, element.index),
    }
}

/// What a client sees of a loaded page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageView {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub title: Option<String>,
    /// "cache" or "network".
    pub source: String,
    pub nav: Vec<NavTarget>,
    /// Whether a worker registration was started for this page.
    pub registration_started: bool,
    pub focus: Option<FocusReport>,
}

/// Result of a key press on the open page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KeyOutcome {
    pub key: String,
    pub default_prevented: bool,
    pub target: Option<String>,
    /// The page loaded by the navigation, if any.
    pub page: Option<PageView>,
}

/// An open page with its key listeners.
pub struct ReaderSession {
    url: Url,
    html: String,
    listeners: KeyUpListeners,
    _keynav: Subscription,
}

/// Shared server state.
pub struct ReaderState {
    pub config: AppConfig,
    pub cache: CacheDb,
    pub fetcher: Arc<dyn Fetcher>,
    pub container: Arc<LocalWorkerContainer>,
    host: HostCapabilities,
    keynav: Arc<KeyNav>,
    focus: FocusSettings,
    session: Mutex<Option<ReaderSession>>,
}

impl ReaderState {
    pub fn new(config: AppConfig, cache: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let keynav = Arc::new(KeyNav::from_settings(&config.keynav)?);
        let focus = FocusSettings::from_settings(&config.keynav);
        let container = Arc::new(LocalWorkerContainer::new(fetcher.clone(), cache.clone(), &config.offline)?);
        let host = if config.offline.enabled {
            HostCapabilities::with_service_worker(container.clone())
        } else {
            HostCapabilities::default()
        };

        Ok(Self { config, cache, fetcher, container, host, keynav, focus, session: Mutex::new(None) })
    }

    /// Open `raw_url`, replacing any open page.
    pub async fn open(&self, raw_url: &str) -> Result<PageView, Error> {
        if raw_url.trim().is_empty() {
            return Err(Error::InvalidInput("url cannot be empty".into()));
        }

        let mut url = canonicalize(raw_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if let Some((_, fragment)) = raw_url.split_once('#') {
            url.set_fragment(Some(fragment));
        }

        let mut session = self.session.lock().await;
        let (next, view) = self.load(url).await?;
        *session = Some(next);
        Ok(view)
    }

    /// Deliver a key-release to the open page and follow any navigation.
    pub async fn press(&self, identifier: &str) -> Result<KeyOutcome, Error> {
        let mut session = self.session.lock().await;
        let current = session.as_ref().ok_or(Error::NoSession)?;

        let mut event = KeyEvent::key_up(Key::from_identifier(identifier));
        let mut location = PendingNavigation::default();
        {
            let page = HtmlPage::parse(&current.html);
            current.listeners.dispatch(&mut event, &page, &mut location)?;
        }

        let target = location.take();
        let page = match &target {
            Some(target) => {
                let next_url = resolve(&current.url, target).map_err(|e| Error::InvalidUrl(e.to_string()))?;
                let (next, view) = self.load(next_url).await?;
                *session = Some(next);
                Some(view)
            }
            None => None,
        };

        Ok(KeyOutcome { key: identifier.to_string(), default_prevented: event.default_prevented(), target, page })
    }

    async fn fetch_page(&self, url: &Url) -> Result<RouteResponse, Error> {
        let mut request = url.clone();
        request.set_fragment(None);

        match self.container.controller_for(&request).await {
            Some(worker) => Ok(worker.handle_fetch(&request).await?.response),
            None => Ok(RouteResponse::from_fetch(&self.fetcher.fetch(&request).await?)),
        }
    }

    async fn load(&self, url: Url) -> Result<(ReaderSession, PageView), Error> {
        let response = self.fetch_page(&url).await?;
        let html = response.text();

        let (title, nav) = {
            let page = HtmlPage::parse(&html);
            let nav = self
                .keynav
                .targets(&page)
                .into_iter()
                .map(|(link, target)| NavTarget { link: link.as_str().to_string(), target })
                .collect::<Vec<_>>();
            (page.title(), nav)
        };

        let listeners = KeyUpListeners::new();
        let subscription = listeners.subscribe(self.keynav.clone());

        let registration = register_on_load(&self.host, &url, &self.config.offline.worker_script);

        let focus = match schedule_fragment_focus(&url, &html, &self.focus) {
            Some(handle) => match handle.await {
                Ok(log) => Some(FocusReport::from(log)),
                Err(e) => {
                    tracing::warn!(%url, "fragment focus task failed: {e}");
                    None
                }
            },
            None => None,
        };

        tracing::info!(%url, status = response.status, source = ?response.source, "page loaded");

        let view = PageView {
            url: url.to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
            title,
            source: response.source.as_str().to_string(),
            nav,
            registration_started: registration.is_some(),
            focus,
        };
        let session = ReaderSession { url, html, listeners, _keynav: subscription };

        Ok((session, view))
    }
}
