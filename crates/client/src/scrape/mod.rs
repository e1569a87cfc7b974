//! Local metadata scraping from raw HTML.
//!
//! ### Title
//! `og:title`, then `<title>`, then the page hostname.
//!
//! ### Description
//! `og:description`, then `<meta name="description">`, then empty.
//!
//! ### Image
//! `og:image`, then schema.org Product images, then images scoped to
//! `#main`, `main`, `[role=main]` and `body` (noscript blocks first at each
//! scope). Hidden and header images are skipped. The first candidate that
//! actually loads wins; if none does the image is empty.
//!
//! ### Favicon
//! Declared `icon`, `shortcut icon` and `apple-touch-icon(-precomposed)`
//! links, then `/favicon.ico` at the base origin. The first that loads wins;
//! if none does a built-in placeholder icon is returned, so the favicon is
//! never empty.
//!
//! All relative references resolve against `<base href>` when declared.

pub mod candidates;
pub mod visibility;

pub use candidates::{PageCandidates, collect_candidates, collect_favicons};
pub use visibility::is_visible_and_not_chrome;

use std::collections::HashSet;

use url::Url;

use linkcard_core::{AttemptCounter, DimensionCache, ImageResolver};

/// Placeholder favicon used when no candidate loads.
pub const DEFAULT_FAVICON: &str = "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHdpZHRoPSIzMiIgaGVpZ2h0PSIzMiIgdmlld0JveD0iMCAwIDI0IDI0IiBmaWxsPSJub25lIiBzdHJva2U9IiM4ODgiIHN0cm9rZS13aWR0aD0iMiIgc3Ryb2tlLWxpbmVjYXA9InJvdW5kIiBzdHJva2UtbGluZWpvaW49InJvdW5kIj48Y2lyY2xlIGN4PSIxMiIgY3k9IjEyIiByPSIxMCIvPjxwYXRoIGQ9Ik0yIDEyaDIwTTEyIDJhMTUuMyAxNS4zIDAgMCAxIDQgMTAgMTUuMyAxNS4zIDAgMCAxLTQgMTAgMTUuMyAxNS4zIDAgMCAxLTQtMTAgMTUuMyAxNS4zIDAgMCAxIDQtMTB6Ii8+PC9zdmc+";

/// Verified metadata of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPage {
    pub title: String,
    pub description: String,
    /// First loadable image candidate, or empty.
    pub image: String,
    /// First loadable favicon, or [`DEFAULT_FAVICON`].
    pub favicon: String,
}

/// Scrapes pages and verifies candidates through the session image caches.
#[derive(Clone)]
pub struct LocalScraper {
    resolver: ImageResolver,
    cache: DimensionCache,
    attempts: AttemptCounter,
}

impl LocalScraper {
    pub fn new(resolver: ImageResolver, cache: DimensionCache, attempts: AttemptCounter) -> Self {
        Self { resolver, cache, attempts }
    }

    /// Extract title, description, image and favicon from `html`.
    pub async fn scrape(&self, html: &str, page_url: &Url) -> ScrapedPage {
        let PageCandidates { title, description, images, favicons } = collect_candidates(html, page_url);
        let mut failed = HashSet::new();

        let image = self.first_loadable(images, &mut failed).await.unwrap_or_default();
        let favicon = self
            .first_loadable(favicons, &mut failed)
            .await
            .unwrap_or_else(|| DEFAULT_FAVICON.to_string());

        tracing::debug!(%page_url, %title, %image, "scraped page");

        ScrapedPage { title, description, image, favicon }
    }

    /// Favicon lookup alone, for metadata that came from elsewhere.
    pub async fn favicon(&self, html: &str, page_url: &Url) -> String {
        let favicons = collect_favicons(html, page_url);
        self.first_loadable(favicons, &mut HashSet::new())
            .await
            .unwrap_or_else(|| DEFAULT_FAVICON.to_string())
    }

    async fn first_loadable(&self, candidates: Vec<String>, failed: &mut HashSet<String>) -> Option<String> {
        for candidate in candidates {
            if failed.contains(&candidate) {
                continue;
            }
            match self
                .resolver
                .resolve(&candidate, Some(&self.cache), Some(&self.attempts))
                .await
            {
                Ok(_) => return Some(candidate),
                Err(e) => {
                    tracing::debug!(candidate = %e.key, "discarding unloadable candidate: {}", e.reason);
                    failed.insert(candidate);
                }
            }
        }
        None
    }
}
