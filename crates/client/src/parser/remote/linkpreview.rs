//! [LinkPreview](https://www.linkpreview.net) API.
//!
//! The key travels in a header and the page URL in a form body.

use serde::Deserialize;

use super::{ApiTemplate, malformed};
use crate::parser::ParserKind;
use linkcard_core::{Error, RawLinkData};

pub const API: &str = "https://api.linkpreview.net";

pub fn template() -> ApiTemplate {
    ApiTemplate::post(API, "q={url}")
        .header("X-Linkpreview-Api-Key", "{api_key}")
        .header("Content-Type", "application/x-www-form-urlencoded")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Response {
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    /// Service-level error code, reported with a 200 status.
    error: Option<u16>,
}

pub fn process(body: &[u8]) -> Result<RawLinkData, Error> {
    let response: Response = serde_json::from_slice(body).map_err(|e| malformed(ParserKind::Linkpreview, e))?;

    if let Some(code) = response.error {
        return Err(Error::FetchFailed(format!(
            "linkpreview error {}: {}",
            code,
            response.description.unwrap_or_default()
        )));
    }

    Ok(RawLinkData {
        title: response.title.unwrap_or_default(),
        description: response.description.unwrap_or_default(),
        image: response.image.unwrap_or_default(),
        favicon: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_fields() {
        let raw = process(br#"{"title":"T","description":"D","image":"https://a/i.png","url":"https://a"}"#).unwrap();
        assert_eq!(raw.title, "T");
        assert_eq!(raw.description, "D");
        assert_eq!(raw.image, "https://a/i.png");
        assert_eq!(raw.favicon, None);
    }

    #[test]
    fn test_process_null_fields() {
        let raw = process(br#"{"title":"T","description":null,"image":null,"error":null}"#).unwrap();
        assert_eq!(raw.title, "T");
        assert_eq!(raw.description, "");
        assert_eq!(raw.image, "");
    }

    #[test]
    fn test_process_service_error() {
        let err = process(br#"{"title":"","description":"Invalid response status code (0)","error":424}"#).unwrap_err();
        assert!(matches!(err, Error::FetchFailed(msg) if msg.contains("424")));
    }
}
