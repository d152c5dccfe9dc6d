//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (QUIRE_*)
//! 2. TOML config file (if QUIRE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (QUIRE_*), nested keys separated by `__`
/// 2. TOML config file (if QUIRE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite response cache.
    ///
    /// Set via QUIRE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via QUIRE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via QUIRE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via QUIRE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Keyboard navigation settings.
    #[serde(default)]
    pub keynav: KeyNavSettings,

    /// Offline cache settings.
    #[serde(default)]
    pub offline: OfflineSettings,
}

/// What to do when a designated navigation link is absent from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingLinkPolicy {
    /// Surface `Error::MissingLink` to the caller.
    Error,
    /// Log a warning and treat the key press as a no-op.
    Ignore,
}

impl Default for MissingLinkPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) { Self::Error } else { Self::Ignore }
    }
}

/// Selectors and timings for keyboard navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyNavSettings {
    #[serde(default = "default_previous_selector")]
    pub previous_selector: String,

    #[serde(default = "default_next_selector")]
    pub next_selector: String,

    /// Table of contents link, nested inside its container.
    #[serde(default = "default_toc_selector")]
    pub toc_selector: String,

    /// Attribute holding the navigation target.
    #[serde(default = "default_link_attribute")]
    pub link_attribute: String,

    #[serde(default)]
    pub missing_link: MissingLinkPolicy,

    /// Delay before a URL fragment target is highlighted and scrolled to.
    #[serde(default = "default_focus_delay_ms")]
    pub focus_delay_ms: u64,

    /// Class added to the parent of the fragment target.
    #[serde(default = "default_highlight_class")]
    pub highlight_class: String,
}

fn default_previous_selector() -> String {
    "a.go-previous".into()
}

fn default_next_selector() -> String {
    "a.go-next".into()
}

fn default_toc_selector() -> String {
    "span#reader-toc a".into()
}

fn default_link_attribute() -> String {
    "href".into()
}

fn default_focus_delay_ms() -> u64 {
    1_000
}

fn default_highlight_class() -> String {
    "highlight".into()
}

impl Default for KeyNavSettings {
    fn default() -> Self {
        Self {
            previous_selector: default_previous_selector(),
            next_selector: default_next_selector(),
            toc_selector: default_toc_selector(),
            link_attribute: default_link_attribute(),
            missing_link: MissingLinkPolicy::default(),
            focus_delay_ms: default_focus_delay_ms(),
            highlight_class: default_highlight_class(),
        }
    }
}

impl KeyNavSettings {
    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms)
    }
}

/// Named caching strategies a route can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkFirst => "network-first",
            Self::CacheFirst => "cache-first",
            Self::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL path pattern bound to a caching strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSettings {
    /// Regular expression matched against the request path.
    pub pattern: String,
    pub strategy: StrategyKind,
}

impl RouteSettings {
    pub fn new(pattern: impl Into<String>, strategy: StrategyKind) -> Self {
        Self { pattern: pattern.into(), strategy }
    }
}

/// Worker registration and routing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineSettings {
    /// Whether the host exposes worker registration at all.
    ///
    /// Set via QUIRE_OFFLINE__ENABLED environment variable.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Worker script, resolved relative to each opened page.
    #[serde(default = "default_worker_script")]
    pub worker_script: String,

    /// Network-first falls back to the cache after this long, if a copy exists.
    #[serde(default)]
    pub network_timeout_ms: Option<u64>,

    /// Keep at most this many responses per worker cache.
    #[serde(default)]
    pub max_entries: Option<usize>,

    #[serde(default = "default_routes")]
    pub routes: Vec<RouteSettings>,
}

fn default_true() -> bool {
    true
}

fn default_worker_script() -> String {
    "sw.js".into()
}

/// Scripts, images, then pages and stylesheets.
pub fn default_routes() -> Vec<RouteSettings> {
    vec![
        RouteSettings::new(r"\.js$", StrategyKind::NetworkFirst),
        RouteSettings::new(r"\.(?:png|gif|jpg|jpeg|svg)$", StrategyKind::CacheFirst),
        RouteSettings::new(r"\.(?:html|css)$", StrategyKind::CacheFirst),
    ]
}

impl Default for OfflineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_script: default_worker_script(),
            network_timeout_ms: None,
            max_entries: None,
            routes: default_routes(),
        }
    }
}

impl OfflineSettings {
    pub fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout_ms.map(Duration::from_millis)
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./quire-cache.sqlite")
}

fn default_user_agent() -> String {
    "quire/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            keynav: KeyNavSettings::default(),
            offline: OfflineSettings::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `QUIRE_`
    /// 2. TOML file from `QUIRE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("QUIRE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("QUIRE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./quire-cache.sqlite"));
        assert_eq!(config.user_agent, "quire/0.1");
        assert_eq!(config.max_bytes, 10_485_760);
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.offline.enabled);
        assert_eq!(config.offline.worker_script, "sw.js");
        assert_eq!(config.offline.routes.len(), 3);
    }

    #[test]
    fn test_default_keynav_selectors() {
        let keynav = KeyNavSettings::default();
        assert_eq!(keynav.previous_selector, "a.go-previous");
        assert_eq!(keynav.next_selector, "a.go-next");
        assert_eq!(keynav.toc_selector, "span#reader-toc a");
        assert_eq!(keynav.link_attribute, "href");
        assert_eq!(keynav.focus_delay(), Duration::from_millis(1_000));
    }

    #[test]
    fn test_default_route_strategies() {
        let routes = default_routes();
        assert_eq!(routes[0].strategy, StrategyKind::NetworkFirst);
        assert_eq!(routes[1].strategy, StrategyKind::CacheFirst);
        assert_eq!(routes[2].strategy, StrategyKind::CacheFirst);
    }

    #[test]
    fn test_strategy_kind_serde() {
        let kind: StrategyKind = serde_json::from_str(r#""stale-while-revalidate""#).unwrap();
        assert_eq!(kind, StrategyKind::StaleWhileRevalidate);
        assert_eq!(serde_json::to_string(&StrategyKind::NetworkFirst).unwrap(), r#""network-first""#);
    }

    #[test]
    fn test_routes_from_toml() {
        let toml = r#"
            [offline]
            network_timeout_ms = 3000

            [[offline.routes]]
            pattern = '\.js$'
            strategy = "stale-while-revalidate"
        "#;
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap();

        assert_eq!(config.offline.routes, vec![RouteSettings::new(r"\.js$", StrategyKind::StaleWhileRevalidate)]);
        assert_eq!(config.offline.network_timeout(), Some(Duration::from_millis(3000)));
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }
}
