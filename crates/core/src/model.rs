//! Normalized link metadata.
//!
//! `title` and `description` end up in a line-oriented block format, so both
//! are flattened to a single line and backslash-escaped when a
//! [`ParsedLinkData`] is built from a parser's raw output.

use serde::{Deserialize, Serialize};

/// Fields a parser variant extracts before shared enrichment runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLinkData {
    pub title: String,
    pub description: String,
    /// Image URL, or empty when none was found.
    pub image: String,
    pub favicon: Option<String>,
}

/// Canonical link preview output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedLinkData {
    pub title: String,
    /// Image URL or vault path, or empty when none was found.
    pub image: String,
    pub description: String,
    pub url: String,
    /// `height / width * 100`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl ParsedLinkData {
    /// Build the canonical shape from raw fields, normalizing text fields.
    pub fn from_raw(raw: RawLinkData, url: &str) -> Self {
        Self {
            title: normalize_line(&raw.title),
            image: raw.image.trim().to_string(),
            description: normalize_line(&raw.description),
            url: url.to_string(),
            aspect_ratio: None,
            favicon: raw.favicon.filter(|f| !f.trim().is_empty()),
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}

/// Flatten a value onto one line and escape backslashes and double quotes.
pub fn normalize_line(input: &str) -> String {
    let flattened = input.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let mut out = String::with_capacity(flattened.len());
    for ch in flattened.trim().chars() {
        if ch == '\\' || ch == '"' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
