//! Core types and shared functionality for quire.
//!
//! This crate provides:
//! - Response cache with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, StoredResponse};
pub use config::{AppConfig, ConfigError, KeyNavSettings, MissingLinkPolicy, OfflineSettings, RouteSettings, StrategyKind};
pub use error::Error;
