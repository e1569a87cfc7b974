//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::link_preview::{LinkPreviewParams, preview_impl};

use linkcard_client::ParserFactory;
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

/// The main MCP server handler for linkcard.
#[derive(Clone)]
pub struct LinkCardServer {
    tool_router: ToolRouter<Self>,
    factory: ParserFactory,
}

#[tool_router]
impl LinkCardServer {
    /// Create a new server handler over a configured parser factory.
    pub fn new(factory: ParserFactory) -> Self {
        Self { tool_router: Self::tool_router(), factory }
    }

    /// Resolve a URL into link card metadata.
    ///
    /// Parsers are tried in order until one succeeds.
    #[tool(
        description = "Resolve a URL into link preview metadata (title, description, image, favicon, aspect ratio). Tries parsers in order and reports which one succeeded."
    )]
    async fn link_preview(&self, params: Parameters<LinkPreviewParams>) -> Result<CallToolResult, McpError> {
        preview_impl(&self.factory, params.0).await
    }
}

impl ServerHandler for LinkCardServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "linkcard".into(),
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
