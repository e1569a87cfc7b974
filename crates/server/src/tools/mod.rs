//! MCP tool implementations.

pub mod link_preview;
