//! Image dimension resolution with a failure-counting cache.
//!
//! Keys are image URLs, data URIs or vault paths, used verbatim. A key that
//! fails to load [`MAX_ATTEMPTS`] times is poisoned: it is pinned to
//! [`ImageDimensions::DEFAULT`] in the supplied cache and never loaded again
//! for the lifetime of that cache.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ImageLoadError;

/// Failed loads after which a key is poisoned.
pub const MAX_ATTEMPTS: u32 = 5;

/// Natural image size and its aspect ratio as a padding percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
    /// `height / width * 100`
    pub aspect_ratio: f64,
}

impl ImageDimensions {
    /// Square fallback used for poisoned keys.
    pub const DEFAULT: ImageDimensions = ImageDimensions { width: 100, height: 100, aspect_ratio: 100.0 };

    /// Returns `None` when either side is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height, aspect_ratio: f64::from(height) / f64::from(width) * 100.0 })
    }
}

/// Loads an image and reports its natural `(width, height)`.
#[async_trait::async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, key: &str) -> Result<(u32, u32), ImageLoadError>;
}

/// Caller-owned map of resolved dimensions, shared by cloning.
#[derive(Debug, Clone, Default)]
pub struct DimensionCache {
    entries: Arc<RwLock<HashMap<String, ImageDimensions>>>,
}

impl DimensionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<ImageDimensions> {
        self.entries.read().await.get(key).copied()
    }

    pub async fn insert(&self, key: &str, dimensions: ImageDimensions) {
        self.entries.write().await.insert(key.to_string(), dimensions);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Caller-owned count of failed loads per key, shared by cloning.
#[derive(Debug, Clone, Default)]
pub struct AttemptCounter {
    counts: Arc<RwLock<HashMap<String, u32>>>,
}

impl AttemptCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> u32 {
        self.counts.read().await.get(key).copied().unwrap_or(0)
    }

    /// Record one more failure and return the new count.
    pub async fn increment(&self, key: &str) -> u32 {
        let mut counts = self.counts.write().await;
        let count = counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub async fn clear(&self, key: &str) {
        self.counts.write().await.remove(key);
    }
}

/// Resolves image dimensions through an [`ImageLoader`].
#[derive(Clone)]
pub struct ImageResolver {
    loader: Arc<dyn ImageLoader>,
}

impl ImageResolver {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        Self { loader }
    }

    /// Resolve the dimensions of `key`.
    ///
    /// A cached value is returned without loading. Below the poison ceiling a
    /// failed load is returned as an error so the caller may retry later; the
    /// failure that reaches the ceiling yields [`ImageDimensions::DEFAULT`]
    /// instead. Without an attempt counter every failure is an error.
    pub async fn resolve(
        &self, key: &str, cache: Option<&DimensionCache>, attempts: Option<&AttemptCounter>,
    ) -> Result<ImageDimensions, ImageLoadError> {
        if let Some(cache) = cache
            && let Some(dimensions) = cache.get(key).await
        {
            return Ok(dimensions);
        }

        if let Some(attempts) = attempts
            && attempts.get(key).await >= MAX_ATTEMPTS
        {
            return Ok(poison(key, cache, attempts).await);
        }

        let loaded = self
            .loader
            .load(key)
            .await
            .and_then(|(width, height)| {
                ImageDimensions::new(width, height).ok_or_else(|| ImageLoadError::new(key, "image has zero size"))
            });

        match loaded {
            Ok(dimensions) => {
                if let Some(cache) = cache {
                    cache.insert(key, dimensions).await;
                }
                if let Some(attempts) = attempts {
                    attempts.clear(key).await;
                }
                Ok(dimensions)
            }
            Err(err) => {
                let Some(attempts) = attempts else {
                    return Err(err);
                };
                let count = attempts.increment(key).await;
                tracing::debug!(key = %err.key, count, "image load failed: {}", err.reason);
                if count >= MAX_ATTEMPTS {
                    tracing::warn!(key = %err.key, "image failed {MAX_ATTEMPTS} times, using default dimensions");
                    return Ok(poison(key, cache, attempts).await);
                }
                Err(err)
            }
        }
    }
}

async fn poison(key: &str, cache: Option<&DimensionCache>, attempts: &AttemptCounter) -> ImageDimensions {
    if let Some(cache) = cache {
        cache.insert(key, ImageDimensions::DEFAULT).await;
    }
    attempts.clear(key).await;
    ImageDimensions::DEFAULT
}
