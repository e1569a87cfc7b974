//! Page renderers: capabilities that turn a URL into HTML.
//!
//! [`crate::FetchClient`] implements [`Renderer`] as the portable plain-GET
//! path. [`HeadlessRenderer`] (feature `render`) drives headless
//! Chrome/Chromium via chromiumoxide for script-heavy pages.

use std::time::Duration;
use thiserror::Error;
use url::Url;

use linkcard_core::Error;

/// Errors that can occur during page rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Failed to get page content.
    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),

    /// Timeout waiting for page to load.
    #[error("render timeout after {0}ms")]
    Timeout(u64),

    /// Plain HTTP retrieval failed.
    #[error("fetch failed: {0}")]
    Fetch(String),
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Fetch(msg) => Error::FetchFailed(msg),
            other => Error::RenderFailed(other.to_string()),
        }
    }
}

/// Options for rendering a page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Overall deadline in milliseconds (default: 30000).
    pub timeout_ms: u64,

    /// Time given to scripts after load (default: 1500).
    pub settle_ms: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { timeout_ms: 30000, settle_ms: 1500 }
    }
}

impl RenderOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout_ms: timeout.as_millis() as u64, ..Default::default() }
    }
}

/// Result of rendering a page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Rendered HTML content.
    pub html: String,

    /// Final URL after redirects.
    pub final_url: Url,

    /// Time taken to render in milliseconds.
    pub render_time_ms: u64,
}

/// Turns a URL into page HTML.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError>;
}

#[cfg(feature = "render")]
pub use headless::HeadlessRenderer;

#[cfg(feature = "render")]
mod headless {
    use super::*;
    use chromiumoxide::Page;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures_util::StreamExt;
    use std::time::Instant;

    /// Headless Chrome/Chromium renderer using chromiumoxide.
    pub struct HeadlessRenderer {
        browser: Browser,
    }

    impl HeadlessRenderer {
        /// Launch a headless browser instance.
        ///
        /// A background task drains Chrome DevTools Protocol events for the
        /// lifetime of the browser.
        pub async fn new() -> Result<Self, RenderError> {
            let (browser, mut handler) =
                Browser::launch(BrowserConfig::builder().build().map_err(RenderError::BrowserLaunch)?)
                    .await
                    .map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

            tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        tracing::debug!("browser handler event error: {e}");
                        break;
                    }
                }
            });

            Ok(Self { browser })
        }
    }

    /// Navigate and read the page. Never closes `page`.
    async fn capture(page: &Page, url: &Url, opts: &RenderOptions) -> Result<(String, Option<String>), RenderError> {
        page.goto(url.as_str())
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        tokio::time::sleep(Duration::from_millis(opts.settle_ms)).await;

        let html = page
            .content()
            .await
            .map_err(|e| RenderError::ContentRetrieval(e.to_string()))?;
        let page_url = page
            .url()
            .await
            .map_err(|e| RenderError::ContentRetrieval(e.to_string()))?;

        Ok((html, page_url))
    }

    #[async_trait::async_trait]
    impl Renderer for HeadlessRenderer {
        fn name(&self) -> &'static str {
            "headless"
        }

        async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
            let start = Instant::now();
            let deadline = Duration::from_millis(opts.timeout_ms);

            let page = tokio::time::timeout(deadline, self.browser.new_page("about:blank"))
                .await
                .map_err(|_| RenderError::Timeout(opts.timeout_ms))?
                .map_err(|e| RenderError::Navigation(e.to_string()))?;

            let outcome = tokio::time::timeout(deadline, capture(&page, url, opts)).await;

            // The page is released on every path before the outcome is inspected.
            if let Err(e) = page.close().await {
                tracing::debug!("failed to close page for {url}: {e}");
            }

            let (html, page_url) = outcome.map_err(|_| RenderError::Timeout(opts.timeout_ms))??;
            let final_url = match page_url.as_deref().map(Url::parse) {
                Some(Ok(parsed)) => parsed,
                _ => url.clone(),
            };

            Ok(RenderedPage { html, final_url, render_time_ms: start.elapsed().as_millis() as u64 })
        }
    }

}
