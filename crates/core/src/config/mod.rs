//! Application configuration with layered loading.
//!
//! Configuration is loaded with figment from multiple sources:
//!
//! 1. Environment variables (LINKCARD_*)
//! 2. TOML config file (if LINKCARD_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// API keys for the paid metadata services.
///
/// Nested keys are set with a double underscore, e.g.
/// `LINKCARD_API_KEYS__JSONLINK`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub jsonlink: Option<String>,
    #[serde(default)]
    pub iframely: Option<String>,
    #[serde(default)]
    pub linkpreview: Option<String>,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LINKCARD_*)
/// 2. TOML config file (if LINKCARD_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Parser names tried in order until one succeeds.
    #[serde(default = "default_parsers")]
    pub parsers: Vec<String>,

    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Download found images into the vault and link the local copy.
    #[serde(default)]
    pub save_images_to_vault: bool,

    /// Vault-relative folder for downloaded images.
    #[serde(default = "default_image_folder_path")]
    pub image_folder_path: String,

    /// Vault root directory. Required when `save_images_to_vault` is set.
    #[serde(default)]
    pub vault_path: Option<PathBuf>,

    /// Global ceiling on simultaneous local page loads.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP and render timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per page or image.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Whether the headless browser is tried before a plain GET.
    #[serde(default)]
    pub render_enabled: bool,

    /// Log raw parser payloads at info level.
    #[serde(default)]
    pub debug: bool,
}

fn default_parsers() -> Vec<String> {
    vec!["local".into(), "microlink".into()]
}

fn default_image_folder_path() -> String {
    "link-card-images".into()
}

fn default_max_concurrency() -> usize {
    1
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; linkcard/0.1)".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            parsers: default_parsers(),
            api_keys: ApiKeys::default(),
            save_images_to_vault: false,
            image_folder_path: default_image_folder_path(),
            vault_path: None,
            max_concurrency: default_max_concurrency(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            render_enabled: false,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("LINKCARD_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("LINKCARD_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Look up the API key for a parser by name.
    pub fn api_key(&self, parser: &str) -> Option<&str> {
        let key = match parser {
            "jsonlink" => self.api_keys.jsonlink.as_deref(),
            "iframely" => self.api_keys.iframely.as_deref(),
            "linkpreview" => self.api_keys.linkpreview.as_deref(),
            _ => None,
        };
        key.filter(|k| !k.trim().is_empty())
    }
}
