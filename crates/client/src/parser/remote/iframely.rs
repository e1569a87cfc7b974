//! [Iframely](https://iframely.com) API.

use serde::Deserialize;

use super::{ApiTemplate, malformed};
use crate::parser::ParserKind;
use linkcard_core::{Error, RawLinkData};

pub const API: &str = "https://iframe.ly/api/iframely?url={url}&api_key={api_key}";

pub fn template() -> ApiTemplate {
    ApiTemplate::get(API)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Response {
    meta: Option<Meta>,
    links: Option<Links>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Meta {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Links {
    thumbnail: Option<Vec<Option<Link>>>,
    icon: Option<Vec<Option<Link>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Link {
    href: Option<String>,
}

fn first_href(links: Option<Vec<Option<Link>>>) -> Option<String> {
    links
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter_map(|l| l.href)
        .find(|href| !href.is_empty())
}

pub fn process(body: &[u8]) -> Result<RawLinkData, Error> {
    let response: Response = serde_json::from_slice(body).map_err(|e| malformed(ParserKind::Iframely, e))?;

    let meta = response.meta.unwrap_or_default();
    let links = response.links.unwrap_or_default();

    Ok(RawLinkData {
        title: meta.title.unwrap_or_default(),
        description: meta.description.unwrap_or_default(),
        image: first_href(links.thumbnail).unwrap_or_default(),
        favicon: first_href(links.icon),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_nested_fields() {
        let raw = process(
            br#"{
                "meta": {"title": "T", "description": "D", "site": "S"},
                "links": {
                    "thumbnail": [{"href": "https://a/t.jpg", "type": "image/jpeg"}],
                    "icon": [{"href": "https://a/i.png"}]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(raw.title, "T");
        assert_eq!(raw.image, "https://a/t.jpg");
        assert_eq!(raw.favicon.as_deref(), Some("https://a/i.png"));
    }

    #[test]
    fn test_process_null_fields() {
        let raw = process(br#"{"meta":null,"links":{"thumbnail":[{"href":null},{"href":"https://a/t.jpg"}],"icon":null}}"#)
            .unwrap();
        assert_eq!(raw.title, "");
        assert_eq!(raw.image, "https://a/t.jpg");
        assert_eq!(raw.favicon, None);

        let raw = process(br#"{"meta":{"title":null},"links":null}"#).unwrap();
        assert_eq!(raw, RawLinkData::default());
    }

    #[test]
    fn test_process_without_links() {
        let raw = process(br#"{"meta":{"title":"T"}}"#).unwrap();
        assert_eq!(raw.image, "");
        assert_eq!(raw.favicon, None);
    }
}
