//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::session::ReaderState;
use crate::tools::cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
use crate::tools::reader_key::{ReaderKeyParams, key_impl};
use crate::tools::reader_open::{ReaderOpenParams, open_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use std::sync::Arc;

/// The main MCP server handler for the quire reader.
#[derive(Clone)]
pub struct QuireReaderServer {
    state: Arc<ReaderState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl QuireReaderServer {
    /// Create a new server handler over shared reader state.
    pub fn new(state: Arc<ReaderState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    /// Open a reading page.
    #[tool(
        description = "Open a reading page. Loads through the offline worker when one controls the URL, registers the worker script, and focuses a #fragment target. Returns title, navigation links and focus report."
    )]
    async fn reader_open(&self, params: Parameters<ReaderOpenParams>) -> Result<CallToolResult, McpError> {
        open_impl(&self.state, params.0).await
    }

    /// Press a key on the open page.
    #[tool(
        description = "Send a key-release to the open page. ArrowLeft, ArrowRight and Escape follow the previous, next and table-of-contents links."
    )]
    async fn reader_key(&self, params: Parameters<ReaderKeyParams>) -> Result<CallToolResult, McpError> {
        key_impl(&self.state, params.0).await
    }

    /// Look up a cached response.
    #[tool(description = "Get metadata of a response held in an offline cache, by URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state, params.0).await
    }

    /// Purge cached responses.
    #[tool(description = "Purge cached responses by age in days, domain, or maximum entry count.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.state, params.0).await
    }
}

impl ServerHandler for QuireReaderServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "quire-reader".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
