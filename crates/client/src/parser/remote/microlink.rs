//! [microlink.io](https://microlink.io) metadata API. No key required.

use serde::Deserialize;

use super::{ApiTemplate, malformed};
use crate::parser::ParserKind;
use linkcard_core::{Error, RawLinkData};

pub const API: &str = "https://api.microlink.io/?url={url}";

pub fn template() -> ApiTemplate {
    ApiTemplate::get(API)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Response {
    status: Option<String>,
    message: Option<String>,
    data: Option<Data>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Data {
    title: Option<String>,
    description: Option<String>,
    image: Option<Asset>,
    logo: Option<Asset>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Asset {
    url: Option<String>,
}

pub fn process(body: &[u8]) -> Result<RawLinkData, Error> {
    let response: Response = serde_json::from_slice(body).map_err(|e| malformed(ParserKind::Microlink, e))?;

    let status = response.status.unwrap_or_default();
    if status != "success" {
        return Err(Error::FetchFailed(format!(
            "microlink reported {}: {}",
            if status.is_empty() { "no status" } else { status.as_str() },
            response.message.unwrap_or_default()
        )));
    }

    let data = response.data.unwrap_or_default();
    Ok(RawLinkData {
        title: data.title.unwrap_or_default(),
        description: data.description.unwrap_or_default(),
        image: data.image.and_then(|a| a.url).unwrap_or_default(),
        favicon: data.logo.and_then(|a| a.url),
    })
}
