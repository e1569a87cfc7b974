//! Per-session shared state.
//!
//! A session corresponds to one editor document: every parser built for it
//! shares the same image caches, limiter and HTTP clients.

use std::sync::Arc;

use crate::fetch::{FetchClient, FetchConfig};
use crate::loader::HttpImageLoader;
use crate::render::Renderer;
use crate::scrape::LocalScraper;
use crate::vault::Vault;
use linkcard_core::{AppConfig, AttemptCounter, ConcurrencyLimiter, DimensionCache, Error, ImageLoader, ImageResolver};

/// Shared handles for one editor session.
#[derive(Clone)]
pub struct Session {
    pub fetch: FetchClient,
    /// Caps simultaneous page loads across all local parsers.
    pub limiter: ConcurrencyLimiter,
    pub cache: DimensionCache,
    pub attempts: AttemptCounter,
    resolver: ImageResolver,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Session {
    /// Build a session from configuration. Persisted images are readable
    /// through `vault` when one is given.
    pub fn new(config: &AppConfig, vault: Option<Arc<dyn Vault>>) -> Result<Self, Error> {
        let fetch = FetchClient::new(FetchConfig::from(config))?;

        let mut loader = HttpImageLoader::new(fetch.clone());
        if let Some(vault) = vault {
            loader = loader.with_vault(vault);
        }

        Ok(Self {
            fetch,
            limiter: ConcurrencyLimiter::new(config.max_concurrency),
            cache: DimensionCache::new(),
            attempts: AttemptCounter::new(),
            resolver: ImageResolver::new(Arc::new(loader)),
            renderer: None,
        })
    }

    /// Prefer `renderer` over the plain GET when loading pages locally.
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Replace the image loader.
    pub fn with_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.resolver = ImageResolver::new(loader);
        self
    }

    pub fn resolver(&self) -> &ImageResolver {
        &self.resolver
    }

    /// Scraper that verifies candidates through this session's caches.
    pub fn scraper(&self) -> LocalScraper {
        LocalScraper::new(self.resolver.clone(), self.cache.clone(), self.attempts.clone())
    }

    /// Page renderers in the order they are tried.
    pub fn renderers(&self) -> Vec<Arc<dyn Renderer>> {
        let mut renderers = Vec::with_capacity(2);
        if let Some(renderer) = &self.renderer {
            renderers.push(Arc::clone(renderer));
        }
        renderers.push(Arc::new(self.fetch.clone()) as Arc<dyn Renderer>);
        renderers
    }
}
