//! reader_key tool implementation.
//!
//! Sends a key-release to the open page; navigation keys load the linked page.

use crate::session::{KeyOutcome, ReaderState};
use quire_core::Error;
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for reader_key tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReaderKeyParams {
    /// Key identifier, e.g. "ArrowLeft", "ArrowRight" or "Escape".
    pub key: String,
}

/// Implementation of the reader_key tool.
pub async fn key_impl(state: &ReaderState, params: ReaderKeyParams) -> Result<CallToolResult, McpError> {
    if params.key.is_empty() {
        return Err(Error::InvalidInput("key cannot be empty".into()).into());
    }

    let outcome: KeyOutcome = state.press(&params.key).await?;
    let json = serde_json::to_string_pretty(&outcome)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize outcome: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
