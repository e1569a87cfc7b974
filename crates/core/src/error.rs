//! Unified error types for linkcard.
//!
//! Fetch-stage errors are fatal to one parser attempt. Enrichment-stage
//! errors are swallowed where they occur and never reach this type's callers.

/// Longest image key carried in an [`ImageLoadError`].
const MAX_KEY_CHARS: usize = 150;

/// Unified error types for link metadata resolution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL or parser list).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Remote HTTP request or page retrieval failed.
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Embedded browser render failed.
    #[error("RENDER_FAILED: {0}")]
    RenderFailed(String),

    /// The selected parser needs an API key that is not configured.
    #[error("MISSING_CREDENTIAL: parser '{parser}' requires {field}")]
    MissingCredential { parser: String, field: String },

    /// No parser is registered under this name.
    #[error("UNKNOWN_PARSER: {0}")]
    UnknownParser(String),

    /// Vault read/write failed.
    #[error("VAULT_ERROR: {0}")]
    Vault(String),

    /// A single parser attempt failed.
    #[error("PARSE_FAILED: {parser} parser failed at {location}: {source}")]
    ParseFailed {
        parser: String,
        location: String,
        #[source]
        source: Box<Error>,
    },

    /// Every parser in the fallback list failed; `last` is the final failure.
    #[error("ALL_PARSERS_FAILED: {tried} parser(s) tried, last error: {last}")]
    AllParsersFailed {
        tried: usize,
        #[source]
        last: Box<Error>,
    },
}

impl Error {
    /// The innermost failure, unwrapping orchestrator and per-attempt wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::ParseFailed { source, .. } => source.root(),
            Error::AllParsersFailed { last, .. } => last.root(),
            other => other,
        }
    }
}

/// An image failed to load or could not be measured.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load image {key}: {reason}")]
pub struct ImageLoadError {
    /// The image key, truncated for diagnostics.
    pub key: String,
    pub reason: String,
}

impl ImageLoadError {
    pub fn new(key: &str, reason: impl Into<String>) -> Self {
        Self { key: truncate_key(key), reason: reason.into() }
    }
}

fn truncate_key(key: &str) -> String {
    match key.char_indices().nth(MAX_KEY_CHARS) {
        Some((idx, _)) => key[..idx].to_string(),
        None => key.to_string(),
    }
}
