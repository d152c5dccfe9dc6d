//! reader_open tool implementation.
//!
//! Loads a page into the reader, replacing whatever page was open.

use crate::session::{PageView, ReaderState};
use quire_core::Error;
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for reader_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReaderOpenParams {
    /// The page URL. A `#fragment` brings that element into focus.
    pub url: String,
}

/// Output structure for reader_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReaderOpenOutput {
    pub page: PageView,
}

/// Implementation of the reader_open tool.
pub async fn open_impl(state: &ReaderState, params: ReaderOpenParams) -> Result<CallToolResult, McpError> {
    let page = state.open(&params.url).await?;

    let output = ReaderOpenOutput { page };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize page: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
