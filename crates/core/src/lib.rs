//! Core types and shared functionality for linkcard.
//!
//! This crate provides:
//! - The normalized link metadata model
//! - Unified error types
//! - Configuration structures
//! - A bounded-concurrency task limiter
//! - Image dimension resolution with failure-counting caches

pub mod config;
pub mod error;
pub mod image;
pub mod limiter;
pub mod model;

pub use config::{ApiKeys, AppConfig, ConfigError};
pub use error::{Error, ImageLoadError};
pub use image::{AttemptCounter, DimensionCache, ImageDimensions, ImageLoader, ImageResolver};
pub use limiter::ConcurrencyLimiter;
pub use model::{ParsedLinkData, RawLinkData, normalize_line};
