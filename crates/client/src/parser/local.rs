//! Local scraping variant.

use url::Url;

use super::{Parser, ParserKind};
use crate::render::{RenderOptions, RenderedPage, Renderer};
use crate::session::Session;
use linkcard_core::{Error, RawLinkData};

/// Loads the page itself and scrapes its HTML.
///
/// Renderers are tried in session order, each run through the session
/// limiter. The first non-empty document wins.
pub struct LocalParser {
    session: Session,
    options: RenderOptions,
}

impl LocalParser {
    pub fn new(session: Session) -> Self {
        let options = RenderOptions::with_timeout(session.fetch.config().timeout);
        Self { session, options }
    }

    /// First non-empty page. When every renderer fails, the preferred
    /// renderer's failure is returned.
    async fn load(&self, url: &Url) -> Result<RenderedPage, Error> {
        let mut first_error: Option<Error> = None;

        for renderer in self.session.renderers() {
            let name = renderer.name();
            let target = url.clone();
            let options = self.options.clone();

            let outcome = self
                .session
                .limiter
                .enqueue(move || async move { renderer.render(&target, &options).await })
                .await;

            let error = match outcome {
                Ok(page) if !page.html.trim().is_empty() => {
                    tracing::debug!(renderer = name, %url, ms = page.render_time_ms, "page loaded");
                    return Ok(page);
                }
                Ok(_) => Error::FetchFailed(format!("{name} returned an empty document for {url}")),
                Err(e) => Error::from(e),
            };

            tracing::debug!(renderer = name, %url, "renderer failed: {}", error);
            if first_error.is_none() {
                first_error = Some(error);
            }
        }

        Err(first_error.unwrap_or_else(|| Error::FetchFailed(format!("no renderer available for {url}"))))
    }
}

#[async_trait::async_trait]
impl Parser for LocalParser {
    fn kind(&self) -> ParserKind {
        ParserKind::Local
    }

    async fn extract(&self, url: &Url) -> Result<RawLinkData, Error> {
        let page = self.load(url).await?;
        let scraped = self.session.scraper().scrape(&page.html, &page.final_url).await;

        Ok(RawLinkData {
            title: scraped.title,
            description: scraped.description,
            image: scraped.image,
            favicon: Some(scraped.favicon),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;
    use crate::scrape::DEFAULT_FAVICON;
    use linkcard_core::{AppConfig, ImageLoadError, ImageLoader};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct NoImages;

    #[async_trait::async_trait]
    impl ImageLoader for NoImages {
        async fn load(&self, key: &str) -> Result<(u32, u32), ImageLoadError> {
            Err(ImageLoadError::new(key, "offline"))
        }
    }

    /// Renderer returning fixed HTML and counting calls.
    struct FixedRenderer {
        html: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Renderer for FixedRenderer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn render(&self, url: &Url, _opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.html {
                Some(html) => Ok(RenderedPage { html: html.to_string(), final_url: url.clone(), render_time_ms: 1 }),
                None => Err(RenderError::Timeout(10)),
            }
        }
    }

    fn session() -> Session {
        Session::new(&AppConfig::default(), None).unwrap().with_loader(Arc::new(NoImages))
    }

    #[tokio::test]
    async fn test_prefers_renderer() {
        let renderer = Arc::new(FixedRenderer { html: Some("<title>Rendered</title>"), calls: AtomicUsize::new(0) });
        let parser = LocalParser::new(session().with_renderer(renderer.clone()));

        let raw = parser.extract(&Url::parse("https://example.com/").unwrap()).await.unwrap();
        assert_eq!(raw.title, "Rendered");
        assert_eq!(raw.favicon.as_deref(), Some(DEFAULT_FAVICON));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_plain_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<head><meta property="og:title" content="Foo"></head>"#)
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let renderer = Arc::new(FixedRenderer { html: None, calls: AtomicUsize::new(0) });
        let parser = LocalParser::new(session().with_renderer(renderer.clone()));

        let raw = parser.extract(&Url::parse(&server.uri()).unwrap()).await.unwrap();
        assert_eq!(raw.title, "Foo");
        assert_eq!(raw.image, "");
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fails_when_no_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  "))
            .mount(&server)
            .await;

        let renderer = Arc::new(FixedRenderer { html: Some(""), calls: AtomicUsize::new(0) });
        let parser = LocalParser::new(session().with_renderer(renderer));

        let err = parser.extract(&Url::parse(&server.uri()).unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::FetchFailed(_)));
    }

    #[tokio::test]
    async fn test_headless_failure_surfaces_as_render_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let renderer = Arc::new(FixedRenderer { html: None, calls: AtomicUsize::new(0) });
        let parser = LocalParser::new(session().with_renderer(renderer));

        let err = parser.extract(&Url::parse(&server.uri()).unwrap()).await.unwrap_err();
        assert!(matches!(&err, Error::RenderFailed(msg) if msg.contains("timeout")), "{err}");
    }

    #[tokio::test]
    async fn test_plain_get_failure_is_fetch_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let parser = LocalParser::new(session());
        let err = parser.extract(&Url::parse(&server.uri()).unwrap()).await.unwrap_err();
        assert!(matches!(&err, Error::FetchFailed(msg) if msg.contains("404")), "{err}");
    }

    #[tokio::test]
    async fn test_hostname_title_fallback() {
        let renderer = Arc::new(FixedRenderer { html: Some("<p>hi</p>"), calls: AtomicUsize::new(0) });
        let parser = LocalParser::new(session().with_renderer(renderer));

        let raw = parser.extract(&Url::parse("https://example.com/page").unwrap()).await.unwrap();
        assert_eq!(raw.title, "example.com");
        assert_eq!(raw.description, "");
    }
}
