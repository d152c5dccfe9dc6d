//! cache_get tool implementation.
//!
//! Retrieves the metadata of a cached response by URL.

use crate::session::ReaderState;
use quire_client::fetch::canonicalize;
use quire_core::Error;
use quire_core::cache::ResponseSummary;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the cached response.
    pub url: String,

    /// Cache to look in. Defaults to the cache of the worker controlling the URL.
    #[serde(default)]
    pub cache_name: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// The cached response, without its body.
    pub response: ResponseSummary,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(state: &ReaderState, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let cache_name = match params.cache_name {
        Some(name) => name,
        None => state
            .container
            .controller_for(&url)
            .await
            .map(|worker| worker.cache_name().to_string())
            .ok_or_else(|| Error::CacheMiss(format!("no worker controls {url}")))?,
    };

    let stored = state
        .cache
        .match_response(&cache_name, url.as_str())
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    let output = CacheGetOutput { response: ResponseSummary::from(&stored) };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PageFetcher;
    use quire_core::{AppConfig, CacheDb, StoredResponse};
    use std::sync::Arc;

    async fn state() -> ReaderState {
        let cache = CacheDb::open_in_memory().await.unwrap();
        ReaderState::new(AppConfig::default(), cache, Arc::new(PageFetcher::new())).unwrap()
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let state = state().await;
        let params = CacheGetParams { url: "https://example.com/app.js".into(), cache_name: Some("book".into()) };

        let err = get_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_without_worker() {
        let state = state().await;
        let params = CacheGetParams { url: "https://example.com/app.js".into(), cache_name: None };

        let err = get_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let state = state().await;
        let stored = StoredResponse::new("book", "https://example.com/app.js", 200, b"console.log(1)".to_vec());
        state.cache.put_response(&stored).await.unwrap();

        let params = CacheGetParams { url: "https://EXAMPLE.com/app.js#x".into(), cache_name: Some("book".into()) };
        let result = get_impl(&state, params).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        let output: CacheGetOutput = serde_json::from_str(text).unwrap();
        assert_eq!(output.response.body_len, 14);
        assert_eq!(output.response.status, 200);
    }
}
