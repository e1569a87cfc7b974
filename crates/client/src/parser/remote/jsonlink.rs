//! [jsonlink.io](https://jsonlink.io) extraction API.

use serde::Deserialize;

use super::{ApiTemplate, malformed};
use crate::parser::ParserKind;
use linkcard_core::{Error, RawLinkData};

pub const API: &str = "https://jsonlink.io/api/extract?url={url}&api_key={api_key}";

pub fn template() -> ApiTemplate {
    ApiTemplate::get(API)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Response {
    title: Option<String>,
    description: Option<String>,
    images: Option<Vec<Option<String>>>,
    favicon: Option<String>,
}

pub fn process(body: &[u8]) -> Result<RawLinkData, Error> {
    let response: Response = serde_json::from_slice(body).map_err(|e| malformed(ParserKind::Jsonlink, e))?;

    Ok(RawLinkData {
        title: response.title.unwrap_or_default(),
        description: response.description.unwrap_or_default(),
        image: response.images.unwrap_or_default().into_iter().flatten().find(|i| !i.is_empty()).unwrap_or_default(),
        favicon: response.favicon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_takes_first_image() {
        let raw = process(
            br#"{"title":"T","description":"multi\nline","images":["https://a/1.png","https://a/2.png"],"favicon":"https://a/f.ico"}"#,
        )
        .unwrap();
        assert_eq!(raw.image, "https://a/1.png");
        assert_eq!(raw.description, "multi\nline");
        assert_eq!(raw.favicon.as_deref(), Some("https://a/f.ico"));
    }

    #[test]
    fn test_process_null_fields() {
        let raw = process(br#"{"title":"T","description":null,"images":null,"favicon":null}"#).unwrap();
        assert_eq!(raw.title, "T");
        assert_eq!(raw.description, "");
        assert_eq!(raw.image, "");
        assert_eq!(raw.favicon, None);

        let raw = process(br#"{"images":[null,"","https://a/2.png"]}"#).unwrap();
        assert_eq!(raw.image, "https://a/2.png");
    }

    #[test]
    fn test_process_missing_fields() {
        let raw = process(b"{}").unwrap();
        assert_eq!(raw, RawLinkData::default());
    }
}
