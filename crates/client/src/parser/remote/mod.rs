//! Remote metadata API variants.
//!
//! Each variant is an [`ApiTemplate`] plus a `process` function that maps
//! the service's JSON onto [`RawLinkData`]. Missing fields become empty
//! strings.
//!
//! ### Templates
//! - `{url}` is replaced by the percent-encoded page URL
//! - `{api_key}` is replaced by the configured key (encoded in the endpoint
//!   and body, verbatim in headers)
//!
//! ### Failures
//! All of the following are `FETCH_FAILED` for the attempt:
//! - network errors and non-2xx statuses (401/403 and 429 get their own message)
//! - bodies over the fetch size limit
//! - malformed JSON or a service-reported error

pub mod iframely;
pub mod jsonlink;
pub mod linkpreview;
pub mod microlink;

use reqwest::{Method, header};
use url::Url;

use super::{Parser, ParserKind};
use crate::fetch::FetchClient;
use linkcard_core::{Error, RawLinkData};

/// Request shape for one metadata API.
#[derive(Debug, Clone)]
pub struct ApiTemplate {
    pub api: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ApiTemplate {
    pub fn get(api: impl Into<String>) -> Self {
        Self { api: api.into(), method: Method::GET, headers: Vec::new(), body: None }
    }

    pub fn post(api: impl Into<String>, body: impl Into<String>) -> Self {
        Self { api: api.into(), method: Method::POST, headers: Vec::new(), body: Some(body.into()) }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Endpoint for `url`, placeholders filled.
    pub fn endpoint(&self, url: &Url, api_key: &str) -> String {
        fill(&self.api, url, api_key, true)
    }
}

fn fill(template: &str, url: &Url, api_key: &str, encode: bool) -> String {
    if encode {
        template
            .replace("{url}", &urlencoding::encode(url.as_str()))
            .replace("{api_key}", &urlencoding::encode(api_key))
    } else {
        template.replace("{url}", url.as_str()).replace("{api_key}", api_key)
    }
}

/// Maps a response body onto the common raw fields.
pub type ProcessFn = fn(&[u8]) -> Result<RawLinkData, Error>;

/// A parser backed by a third-party metadata API.
pub struct RemoteParser {
    kind: ParserKind,
    fetch: FetchClient,
    template: ApiTemplate,
    api_key: Option<String>,
    process: ProcessFn,
}

impl RemoteParser {
    pub fn new(kind: ParserKind, fetch: FetchClient, template: ApiTemplate, process: ProcessFn) -> Self {
        Self { kind, fetch, template, api_key: None, process }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn microlink(fetch: FetchClient) -> Self {
        Self::new(ParserKind::Microlink, fetch, microlink::template(), microlink::process)
    }

    pub fn jsonlink(fetch: FetchClient, api_key: impl Into<String>) -> Self {
        Self::new(ParserKind::Jsonlink, fetch, jsonlink::template(), jsonlink::process).with_api_key(api_key)
    }

    pub fn iframely(fetch: FetchClient, api_key: impl Into<String>) -> Self {
        Self::new(ParserKind::Iframely, fetch, iframely::template(), iframely::process).with_api_key(api_key)
    }

    pub fn linkpreview(fetch: FetchClient, api_key: impl Into<String>) -> Self {
        Self::new(ParserKind::Linkpreview, fetch, linkpreview::template(), linkpreview::process)
            .with_api_key(api_key)
    }

    pub fn template(&self) -> &ApiTemplate {
        &self.template
    }

    async fn request(&self, url: &Url) -> Result<Vec<u8>, Error> {
        let kind = self.kind;
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let endpoint = self.template.endpoint(url, api_key);

        let mut request = self
            .fetch
            .http()
            .request(self.template.method.clone(), &endpoint)
            .header(header::ACCEPT, "application/json");
        for (name, value) in &self.template.headers {
            request = request.header(name.as_str(), fill(value, url, api_key, false));
        }
        if let Some(body) = &self.template.body {
            request = request.body(fill(body, url, api_key, true));
        }

        tracing::debug!(parser = %kind, %url, "querying metadata API");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchFailed(format!("{kind} API timed out"))
            } else {
                Error::FetchFailed(format!("{kind} API network error: {}", e.without_url()))
            }
        })?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(Error::FetchFailed(format!("{kind} API rejected credentials (status {})", status.as_u16())));
        }
        if status == 429 {
            return Err(Error::FetchFailed(format!("{kind} API rate limited")));
        }
        if !status.is_success() {
            return Err(Error::FetchFailed(format!("{kind} API returned status {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::FetchFailed(format!("failed to read {kind} response: {}", e.without_url())))?;

        let max_bytes = self.fetch.config().max_bytes;
        if bytes.len() > max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), max_bytes)));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl Parser for RemoteParser {
    fn kind(&self) -> ParserKind {
        self.kind
    }

    async fn extract(&self, url: &Url) -> Result<RawLinkData, Error> {
        let body = self.request(url).await?;
        tracing::debug!(parser = %self.kind, bytes = body.len(), "metadata API responded");
        (self.process)(&body)
    }
}

/// Malformed response bodies.
pub(crate) fn malformed(kind: ParserKind, err: serde_json::Error) -> Error {
    Error::FetchFailed(format!("malformed {kind} response: {err}"))
}
