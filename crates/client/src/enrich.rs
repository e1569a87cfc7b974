//! Shared enrichment applied to every parser variant's output.
//!
//! Steps run in order: favicon backfill, vault image persistence, aspect
//! ratio. Each step is best-effort; a failure leaves its field unchanged and
//! is only logged.

use url::Url;

use crate::parser::ParserKind;
use crate::session::Session;
use crate::vault::VaultImageStore;
use linkcard_core::ParsedLinkData;

/// Enrichment pipeline bound to one session.
#[derive(Clone)]
pub struct Enricher {
    session: Session,
    store: Option<VaultImageStore>,
}

impl Enricher {
    pub fn new(session: Session) -> Self {
        Self { session, store: None }
    }

    /// Persist found images through `store`.
    pub fn with_store(mut self, store: VaultImageStore) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn enrich(&self, mut data: ParsedLinkData, kind: ParserKind) -> ParsedLinkData {
        if data.favicon.is_none() && kind != ParserKind::Local {
            data.favicon = self.backfill_favicon(&data.url).await;
        }

        if let Some(store) = &self.store
            && data.has_image()
        {
            match store.save(&data.image).await {
                Ok(path) => {
                    tracing::debug!(image = %data.image, %path, "saved image to vault");
                    data.image = path;
                }
                Err(e) => tracing::warn!(image = %data.image, "keeping remote image, vault save failed: {}", e),
            }
        }

        if data.has_image() {
            let session = &self.session;
            match session
                .resolver()
                .resolve(&data.image, Some(&session.cache), Some(&session.attempts))
                .await
            {
                Ok(dimensions) => data.aspect_ratio = Some(dimensions.aspect_ratio),
                Err(e) => tracing::debug!("aspect ratio unavailable: {}", e),
            }
        }

        data
    }

    async fn backfill_favicon(&self, page_url: &str) -> Option<String> {
        let Ok(url) = Url::parse(page_url) else {
            tracing::warn!(%page_url, "favicon backfill skipped, unparseable URL");
            return None;
        };

        let fetch = self.session.fetch.clone();
        let target = url.clone();
        let response = self
            .session
            .limiter
            .enqueue(move || async move { fetch.fetch(target.as_str()).await })
            .await;

        match response {
            Ok(response) => {
                let html = response.text();
                Some(self.session.scraper().favicon(&html, &response.final_url).await)
            }
            Err(e) => {
                tracing::warn!(%url, "favicon backfill failed: {}", e);
                None
            }
        }
    }
}
