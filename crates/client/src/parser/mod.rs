//! Parser contract, variants and the shared parse pipeline.
//!
//! Every parse runs `extract` (fetch and reshape, per variant), then
//! [`ParsedLinkData::from_raw`] normalization, then shared [`Enricher`]
//! steps. Only `extract` differs between variants.

pub mod local;
pub mod remote;

pub use local::LocalParser;
pub use remote::{ApiTemplate, RemoteParser};

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::enrich::Enricher;
use crate::fetch::canonicalize;
use linkcard_core::{Error, ParsedLinkData, RawLinkData};

/// Registered parser variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    Local,
    Microlink,
    Jsonlink,
    Iframely,
    Linkpreview,
}

impl ParserKind {
    pub const ALL: [ParserKind; 5] =
        [ParserKind::Local, ParserKind::Microlink, ParserKind::Jsonlink, ParserKind::Iframely, ParserKind::Linkpreview];

    pub fn name(&self) -> &'static str {
        match self {
            ParserKind::Local => "local",
            ParserKind::Microlink => "microlink",
            ParserKind::Jsonlink => "jsonlink",
            ParserKind::Iframely => "iframely",
            ParserKind::Linkpreview => "linkpreview",
        }
    }

    /// Whether the variant needs an API key.
    pub fn requires_key(&self) -> bool {
        matches!(self, ParserKind::Jsonlink | ParserKind::Iframely | ParserKind::Linkpreview)
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        ParserKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::UnknownParser(s.to_string()))
    }
}

/// One metadata source.
#[async_trait::async_trait]
pub trait Parser: Send + Sync {
    fn kind(&self) -> ParserKind;

    /// Fetch metadata for `url` and reshape it into the common raw fields.
    async fn extract(&self, url: &Url) -> Result<RawLinkData, Error>;
}

/// A configured parser plus the shared enrichment pipeline.
pub struct LinkParser {
    parser: Box<dyn Parser>,
    enricher: Enricher,
    location: String,
    debug: bool,
}

impl LinkParser {
    pub fn new(parser: Box<dyn Parser>, enricher: Enricher) -> Self {
        Self { parser, enricher, location: String::from("unknown"), debug: false }
    }

    /// Caller context embedded in failure messages.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Log intermediate fields at info level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn kind(&self) -> ParserKind {
        self.parser.kind()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Resolve `url` into normalized, enriched link data.
    pub async fn parse(&self, url: &str) -> Result<ParsedLinkData, Error> {
        let kind = self.parser.kind();
        self.run(url).await.map_err(|e| {
            tracing::warn!(parser = %kind, location = %self.location, "parse failed: {}", e);
            Error::ParseFailed { parser: kind.to_string(), location: self.location.clone(), source: Box::new(e) }
        })
    }

    async fn run(&self, url: &str) -> Result<ParsedLinkData, Error> {
        let kind = self.parser.kind();
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let raw = self.parser.extract(&url).await?;
        if self.debug {
            tracing::info!(parser = %kind, title = %raw.title, image = %raw.image, favicon = ?raw.favicon, "raw fields");
        } else {
            tracing::debug!(parser = %kind, title = %raw.title, image = %raw.image, "raw fields");
        }

        let data = ParsedLinkData::from_raw(raw, url.as_str());
        Ok(self.enricher.enrich(data, kind).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use linkcard_core::AppConfig;

    struct FixedParser(Result<RawLinkData, &'static str>);

    #[async_trait::async_trait]
    impl Parser for FixedParser {
        fn kind(&self) -> ParserKind {
            ParserKind::Local
        }

        async fn extract(&self, _url: &Url) -> Result<RawLinkData, Error> {
            self.0.clone().map_err(|e| Error::FetchFailed(e.to_string()))
        }
    }

    fn link_parser(result: Result<RawLinkData, &'static str>) -> LinkParser {
        let session = Session::new(&AppConfig::default(), None).unwrap();
        LinkParser::new(Box::new(FixedParser(result)), Enricher::new(session))
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in ParserKind::ALL {
            assert_eq!(kind.name().parse::<ParserKind>().unwrap(), kind);
        }
        assert_eq!(" MicroLink ".parse::<ParserKind>().unwrap(), ParserKind::Microlink);
    }

    #[test]
    fn test_unknown_kind() {
        let err = "opengraph".parse::<ParserKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownParser(name) if name == "opengraph"));
    }

    #[test]
    fn test_requires_key() {
        assert!(!ParserKind::Local.requires_key());
        assert!(!ParserKind::Microlink.requires_key());
        assert!(ParserKind::Jsonlink.requires_key());
        assert!(ParserKind::Iframely.requires_key());
        assert!(ParserKind::Linkpreview.requires_key());
    }

    #[tokio::test]
    async fn test_parse_normalizes_text() {
        let raw = RawLinkData {
            title: "Title\r\nnext".into(),
            description: "Line1\nLine2\"quote\"".into(),
            image: String::new(),
            favicon: Some("https://example.com/favicon.ico".into()),
        };
        let data = link_parser(Ok(raw)).parse("https://Example.com/a#frag").await.unwrap();

        assert_eq!(data.title, "Title next");
        assert_eq!(data.description, "Line1 Line2\\\"quote\\\"");
        assert_eq!(data.url, "https://example.com/a");
        assert_eq!(data.aspect_ratio, None);
    }

    #[tokio::test]
    async fn test_parse_failure_carries_parser_and_location() {
        let err = link_parser(Err("boom"))
            .with_location("notes/today.md")
            .parse("https://example.com")
            .await
            .unwrap_err();

        match &err {
            Error::ParseFailed { parser, location, source } => {
                assert_eq!(parser, "local");
                assert_eq!(location, "notes/today.md");
                assert!(matches!(**source, Error::FetchFailed(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("notes/today.md"));
    }

    #[tokio::test]
    async fn test_parse_rejects_empty_url() {
        let err = link_parser(Ok(RawLinkData::default())).parse("   ").await.unwrap_err();
        assert!(matches!(err.root(), Error::InvalidUrl(_)));
    }
}
