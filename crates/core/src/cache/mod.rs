//! SQLite-backed response cache for worker routes.
//!
//! This module provides a persistent cache of HTTP responses using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named caches, one per worker scope
//! - Keys derived from cache name and canonical URL (SHA-256)
//! - Automatic schema migrations
//! - Purging by age, domain, or entry count

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod responses;

pub use crate::Error;

pub use connection::CacheDb;
pub use responses::{ResponseSummary, StoredResponse};
