//! Client code for linkcard.
//!
//! This crate provides the HTTP fetch pipeline, page renderers, image
//! loading, local HTML scraping, parser variants with their shared
//! enrichment, and the fallback orchestrator used by the server.

pub mod enrich;
pub mod factory;
pub mod fetch;
pub mod loader;
pub mod parser;
pub mod render;
pub mod resolve;
pub mod scrape;
pub mod session;
pub mod vault;

pub use enrich::Enricher;
pub use factory::ParserFactory;
pub use fetch::{FetchClient, FetchConfig, FetchResponse};
pub use loader::HttpImageLoader;
pub use parser::{ApiTemplate, LinkParser, LocalParser, Parser, ParserKind, RemoteParser};
#[cfg(feature = "render")]
pub use render::HeadlessRenderer;
pub use render::{RenderError, RenderOptions, RenderedPage, Renderer};
pub use resolve::{Resolution, resolve_link};
pub use scrape::{DEFAULT_FAVICON, LocalScraper, ScrapedPage, is_visible_and_not_chrome};
pub use session::Session;
pub use vault::{FsVault, Vault, VaultFile, VaultImageStore};
