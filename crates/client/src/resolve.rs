//! Sequential fallback across an ordered parser list.

use serde::Serialize;

use crate::parser::LinkParser;
use linkcard_core::{Error, ParsedLinkData};

/// Successful resolution and the parser that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub data: ParsedLinkData,
    pub used_parser: String,
}

/// Try each parser in `parsers` until one succeeds.
///
/// Attempts run one after another and share nothing. `build` constructs
/// the parser for a name; a build failure counts as a failed attempt. When
/// every attempt fails the last failure is returned inside
/// `ALL_PARSERS_FAILED`.
pub async fn resolve_link<F>(url: &str, parsers: &[String], mut build: F) -> Result<Resolution, Error>
where
    F: FnMut(&str) -> Result<LinkParser, Error>,
{
    if url.trim().is_empty() {
        return Err(Error::InvalidInput("url is empty".to_string()));
    }

    let mut last = Error::InvalidInput("parser list is empty".to_string());
    let mut tried = 0;

    for name in parsers {
        tried += 1;
        let outcome = match build(name) {
            Ok(parser) => parser.parse(url).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(data) => {
                tracing::info!(parser = %name, attempt = tried, %url, "link resolved");
                return Ok(Resolution { data, used_parser: name.clone() });
            }
            Err(e) => {
                tracing::warn!(parser = %name, attempt = tried, %url, "attempt failed: {}", e);
                last = e;
            }
        }
    }

    if tried == 0 {
        return Err(last);
    }

    Err(Error::AllParsersFailed { tried, last: Box::new(last) })
}
