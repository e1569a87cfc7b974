//! link_preview tool implementation.
//!
//! Resolves one URL through the configured parser fallback list.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::to_mcp_error;
use linkcard_client::ParserFactory;
use linkcard_core::{Error, ParsedLinkData};

/// Input parameters for link_preview tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LinkPreviewParams {
    /// The URL to preview.
    pub url: String,

    /// Parsers to try in order (e.g. ["local", "microlink"]).
    /// Defaults to the configured list.
    #[serde(default)]
    pub parsers: Option<Vec<String>>,
}

/// Output structure for link_preview tool.
#[derive(Debug, Clone, Serialize)]
pub struct LinkPreviewOutput {
    /// Normalized link card fields.
    pub data: ParsedLinkData,
    /// Name of the parser that produced `data`.
    pub used_parser: String,
    /// ISO8601 timestamp of the resolution.
    pub fetched_at: String,
}

/// Implementation of the link_preview tool.
pub async fn preview_impl(factory: &ParserFactory, params: LinkPreviewParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(to_mcp_error(Error::InvalidInput("url cannot be empty".into())));
    }

    let resolution = factory
        .resolve(&params.url, params.parsers.as_deref())
        .await
        .map_err(to_mcp_error)?;

    let output = LinkPreviewOutput {
        data: resolution.data,
        used_parser: resolution.used_parser,
        fetched_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    };

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}
