//! cache_purge tool implementation.
//!
//! Purges cached responses by age, domain, or count.

use crate::session::ReaderState;
use quire_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Purge entries older than this many days.
    pub older_than_days: Option<i64>,

    /// Purge entries whose URL matches this domain pattern.
    pub domain: Option<String>,

    /// Keep only the newest N entries across all caches.
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(state: &ReaderState, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.older_than_days.is_none() && params.domain.is_none() && params.max_entries.is_none() {
        return Err(Error::InvalidInput(
            "At least one of older_than_days, domain, or max_entries must be specified".to_string(),
        )
        .into());
    }

    let max_age = match params.older_than_days {
        Some(days) if days < 0 => {
            return Err(Error::InvalidInput(format!("older_than_days must not be negative, got {days}")).into());
        }
        Some(days) => Some(
            chrono::Duration::try_days(days)
                .ok_or_else(|| Error::InvalidInput(format!("older_than_days is out of range, got {days}")))?,
        ),
        None => None,
    };

    let mut deleted_total = 0u64;

    if let Some(max_age) = max_age {
        deleted_total += state.cache.purge_older_than(max_age).await?;
    }

    if let Some(domain) = params.domain {
        deleted_total += state.cache.purge_by_domain(&domain).await?;
    }

    if let Some(max_entries) = params.max_entries {
        deleted_total += state.cache.purge_lru(None, max_entries).await?;
    }

    tracing::info!(deleted = deleted_total, "purged cache");

    let output = CachePurgeOutput { deleted: deleted_total };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PageFetcher;
    use quire_core::{AppConfig, CacheDb, StoredResponse};
    use std::sync::Arc;

    async fn state_with(urls: &[(&str, &str)]) -> ReaderState {
        let cache = CacheDb::open_in_memory().await.unwrap();
        for (url, stored_at) in urls {
            let row = StoredResponse {
                stored_at: stored_at.to_string(),
                ..StoredResponse::new("book", url, 200, Vec::new())
            };
            cache.put_response(&row).await.unwrap();
        }
        ReaderState::new(AppConfig::default(), cache, Arc::new(PageFetcher::new())).unwrap()
    }

    async fn deleted(state: &ReaderState, params: CachePurgeParams) -> u64 {
        let result = purge_impl(state, params).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        let output: CachePurgeOutput = serde_json::from_str(text).unwrap();
        output.deleted
    }

    #[tokio::test]
    async fn test_purge_by_domain() {
        let state = state_with(&[
            ("https://example.com/page1.html", "2026-01-01T00:00:00.000000Z"),
            ("https://other.com/page2.html", "2026-01-01T00:00:00.000000Z"),
        ])
        .await;

        let params =
            CachePurgeParams { older_than_days: None, domain: Some("example.com".to_string()), max_entries: None };
        assert_eq!(deleted(&state, params).await, 1);
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let state = state_with(&[
            ("https://example.com/old.css", "2000-01-01T00:00:00.000000Z"),
            ("https://example.com/new.css", "2999-01-01T00:00:00.000000Z"),
        ])
        .await;

        let params = CachePurgeParams { older_than_days: Some(30), domain: None, max_entries: None };
        assert_eq!(deleted(&state, params).await, 1);
        assert!(state.cache.match_response("book", "https://example.com/new.css").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_lru() {
        let state = state_with(&[
            ("https://example.com/page1.html", "2026-01-01T00:00:00.000000Z"),
            ("https://example.com/page2.html", "2026-01-02T00:00:00.000000Z"),
        ])
        .await;

        let params = CachePurgeParams { older_than_days: None, domain: None, max_entries: Some(1) };
        assert_eq!(deleted(&state, params).await, 1);
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let state = state_with(&[]).await;
        let params = CachePurgeParams { older_than_days: None, domain: None, max_entries: None };

        let result = purge_impl(&state, params).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_purge_negative_days() {
        let state = state_with(&[]).await;
        let params = CachePurgeParams { older_than_days: Some(-1), domain: None, max_entries: None };

        let err = purge_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_purge_older_than_out_of_range() {
        let state = state_with(&[("https://example.com/page1.html", "2026-01-01T00:00:00.000000Z")]).await;

        for days in [100_000_000, i64::MAX] {
            let params = CachePurgeParams { older_than_days: Some(days), domain: None, max_entries: None };
            let err = purge_impl(&state, params).await.unwrap_err();
            assert_eq!(err.code.0, -32602);
        }
        assert!(state.cache.match_response("book", "https://example.com/page1.html").await.unwrap().is_some());
    }
}
