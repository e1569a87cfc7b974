//! Builds configured parsers by name.

use std::sync::Arc;

use crate::enrich::Enricher;
use crate::parser::{LinkParser, LocalParser, Parser, ParserKind, RemoteParser};
use crate::resolve::{Resolution, resolve_link};
use crate::session::Session;
use crate::vault::{Vault, VaultImageStore};
use linkcard_core::{AppConfig, Error};

/// Parser registry bound to one configuration and session.
#[derive(Clone)]
pub struct ParserFactory {
    config: AppConfig,
    session: Session,
    vault: Option<Arc<dyn Vault>>,
    location: String,
}

impl ParserFactory {
    pub fn new(config: AppConfig, session: Session) -> Self {
        Self { config, session, vault: None, location: String::from("unknown") }
    }

    /// Vault used when `save_images_to_vault` is set.
    pub fn with_vault(mut self, vault: Arc<dyn Vault>) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Caller context stamped onto every parser this factory builds.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Construct the parser registered under `name`.
    ///
    /// Fails with `UNKNOWN_PARSER` for unregistered names and
    /// `MISSING_CREDENTIAL` when a keyed variant has no key configured.
    pub fn create(&self, name: &str) -> Result<LinkParser, Error> {
        let kind: ParserKind = name.parse()?;
        let fetch = self.session.fetch.clone();

        let parser: Box<dyn Parser> = match kind {
            ParserKind::Local => Box::new(LocalParser::new(self.session.clone())),
            ParserKind::Microlink => Box::new(RemoteParser::microlink(fetch)),
            ParserKind::Jsonlink => Box::new(RemoteParser::jsonlink(fetch, self.api_key(kind)?)),
            ParserKind::Iframely => Box::new(RemoteParser::iframely(fetch, self.api_key(kind)?)),
            ParserKind::Linkpreview => Box::new(RemoteParser::linkpreview(fetch, self.api_key(kind)?)),
        };

        Ok(LinkParser::new(parser, self.enricher())
            .with_location(self.location.clone())
            .with_debug(self.config.debug))
    }

    /// Resolve `url` through `parsers`, or the configured list when `None`.
    pub async fn resolve(&self, url: &str, parsers: Option<&[String]>) -> Result<Resolution, Error> {
        let parsers = parsers.unwrap_or(&self.config.parsers);
        resolve_link(url, parsers, |name| self.create(name)).await
    }

    fn api_key(&self, kind: ParserKind) -> Result<String, Error> {
        self.config
            .api_key(kind.name())
            .map(str::to_string)
            .ok_or_else(|| Error::MissingCredential {
                parser: kind.to_string(),
                field: format!("api_keys.{}", kind.name()),
            })
    }

    fn enricher(&self) -> Enricher {
        let enricher = Enricher::new(self.session.clone());
        if !self.config.save_images_to_vault {
            return enricher;
        }

        match &self.vault {
            Some(vault) => enricher.with_store(VaultImageStore::new(
                Arc::clone(vault),
                self.session.fetch.clone(),
                self.config.image_folder_path.clone(),
            )),
            None => {
                tracing::warn!("save_images_to_vault is set but no vault is attached; images stay remote");
                enricher
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkcard_core::ApiKeys;

    fn factory(config: AppConfig) -> ParserFactory {
        let session = Session::new(&config, None).unwrap();
        ParserFactory::new(config, session)
    }

    #[test]
    fn test_create_keyless_variants() {
        let factory = factory(AppConfig::default());
        assert_eq!(factory.create("local").unwrap().kind(), ParserKind::Local);
        assert_eq!(factory.create("microlink").unwrap().kind(), ParserKind::Microlink);
    }

    #[test]
    fn test_missing_credential() {
        let factory = factory(AppConfig::default());
        for name in ["jsonlink", "iframely", "linkpreview"] {
            let err = factory.create(name).err().unwrap();
            assert!(matches!(&err, Error::MissingCredential { parser, .. } if parser == name), "{err}");
        }
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = AppConfig {
            api_keys: ApiKeys { jsonlink: Some("  ".into()), ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(factory(config).create("jsonlink"), Err(Error::MissingCredential { .. })));
    }

    #[test]
    fn test_keyed_variant_with_key() {
        let config = AppConfig {
            api_keys: ApiKeys { iframely: Some("k".into()), ..Default::default() },
            ..Default::default()
        };
        assert_eq!(factory(config).create("iframely").unwrap().kind(), ParserKind::Iframely);
    }

    #[test]
    fn test_unknown_parser() {
        let err = factory(AppConfig::default()).create("opengraph").err().unwrap();
        assert!(matches!(err, Error::UnknownParser(_)));
    }

    #[test]
    fn test_location_propagates() {
        let parser = factory(AppConfig::default()).with_location("doc.md:12").create("local").unwrap();
        assert_eq!(parser.location(), "doc.md:12");
    }
}
