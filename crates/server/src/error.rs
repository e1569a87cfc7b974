//! Maps linkcard errors onto MCP error data.
//!
//! Wrapped failures (`PARSE_FAILED`, `ALL_PARSERS_FAILED`) take the code of
//! their innermost cause; the message keeps the full chain.

use linkcard_core::Error;
use rmcp::model::{ErrorCode, ErrorData as McpError};

fn code(err: &Error) -> i32 {
    match err.root() {
        Error::InvalidInput(_) => -32602,
        Error::InvalidUrl(_) => -32003,
        Error::FetchTooLarge(_) => -32007,
        Error::FetchFailed(_) => -32008,
        Error::RenderFailed(_) => -32012,
        Error::MissingCredential { .. } => -32013,
        Error::UnknownParser(_) => -32014,
        Error::Vault(_) => -32016,
        Error::ParseFailed { .. } | Error::AllParsersFailed { .. } => -32000,
    }
}

pub fn to_mcp_error(err: Error) -> McpError {
    McpError { code: ErrorCode(code(&err)), message: err.to_string().into(), data: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_error_code() {
        let mcp_err = to_mcp_error(Error::InvalidInput("url is empty".into()));
        assert_eq!(mcp_err.code.0, -32602);
        assert!(mcp_err.message.contains("INVALID_INPUT"));
    }

    #[test]
    fn test_wrapped_error_uses_root_code() {
        let err = Error::AllParsersFailed {
            tried: 2,
            last: Box::new(Error::ParseFailed {
                parser: "microlink".into(),
                location: "notes.md".into(),
                source: Box::new(Error::FetchFailed("microlink API rate limited".into())),
            }),
        };
        let mcp_err = to_mcp_error(err);
        assert_eq!(mcp_err.code.0, -32008);
        assert!(mcp_err.message.contains("ALL_PARSERS_FAILED"));
        assert!(mcp_err.message.contains("rate limited"));
    }
}
