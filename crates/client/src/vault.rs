//! Vault storage capability and image persistence.
//!
//! The vault is the note collection on disk. Image saving is optional and
//! never required for a parse to succeed.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::fetch::FetchClient;
use linkcard_core::Error;

/// Extensions recognized in image URLs and content types.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "avif", "bmp"];

/// A file stored in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFile {
    /// Vault-relative path.
    pub path: String,
    pub size: u64,
}

/// Storage operations the image persistence step needs from a vault.
///
/// All paths are vault-relative and use `/` separators.
#[async_trait::async_trait]
pub trait Vault: Send + Sync {
    async fn create_folder(&self, path: &str) -> Result<(), Error>;

    async fn get_file_by_path(&self, path: &str) -> Result<Option<VaultFile>, Error>;

    async fn read_binary(&self, path: &str) -> Result<Vec<u8>, Error>;

    /// Create a new file. Fails if the file already exists.
    async fn create_binary(&self, path: &str, data: &[u8]) -> Result<VaultFile, Error>;

    async fn delete(&self, path: &str) -> Result<(), Error>;
}

/// A vault rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a vault path onto the filesystem, refusing anything that escapes the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(Error::Vault(format!("path escapes vault: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl Vault for FsVault {
    async fn create_folder(&self, path: &str) -> Result<(), Error> {
        let dir = self.resolve(path)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Vault(format!("failed to create folder {path}: {e}")))
    }

    async fn get_file_by_path(&self, path: &str) -> Result<Option<VaultFile>, Error> {
        let file = self.resolve(path)?;
        match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.is_file() => Ok(Some(VaultFile { path: path.to_string(), size: meta.len() })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Vault(format!("failed to stat {path}: {e}"))),
        }
    }

    async fn read_binary(&self, path: &str) -> Result<Vec<u8>, Error> {
        let file = self.resolve(path)?;
        tokio::fs::read(&file)
            .await
            .map_err(|e| Error::Vault(format!("failed to read {path}: {e}")))
    }

    async fn create_binary(&self, path: &str, data: &[u8]) -> Result<VaultFile, Error> {
        let file = self.resolve(path)?;
        let mut handle = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file)
            .await
            .map_err(|e| Error::Vault(format!("failed to create {path}: {e}")))?;
        handle
            .write_all(data)
            .await
            .map_err(|e| Error::Vault(format!("failed to write {path}: {e}")))?;
        handle
            .flush()
            .await
            .map_err(|e| Error::Vault(format!("failed to write {path}: {e}")))?;

        Ok(VaultFile { path: path.to_string(), size: data.len() as u64 })
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let file = self.resolve(path)?;
        tokio::fs::remove_file(&file)
            .await
            .map_err(|e| Error::Vault(format!("failed to delete {path}: {e}")))
    }
}

/// Downloads remote images into a vault folder.
#[derive(Clone)]
pub struct VaultImageStore {
    vault: Arc<dyn Vault>,
    fetch: FetchClient,
    folder: String,
}

impl VaultImageStore {
    pub fn new(vault: Arc<dyn Vault>, fetch: FetchClient, folder: impl Into<String>) -> Self {
        let folder = folder.into().trim_matches('/').to_string();
        Self { vault, fetch, folder }
    }

    /// Persist `image_url` and return its vault path.
    ///
    /// File names derive from the URL, so saving the same image twice reuses
    /// the first copy. An empty leftover file is replaced.
    pub async fn save(&self, image_url: &str) -> Result<String, Error> {
        if !(image_url.starts_with("http://") || image_url.starts_with("https://")) {
            return Err(Error::InvalidInput(format!("not a remote image: {image_url}")));
        }

        let stem = file_stem(image_url);

        if let Some(ext) = extension_from_url(image_url) {
            let path = self.path_for(&stem, ext);
            if let Some(existing) = self.vault.get_file_by_path(&path).await?
                && existing.size > 0
            {
                tracing::debug!(path = %path, "image already in vault");
                return Ok(path);
            }
        }

        let response = self.fetch.fetch_image(image_url).await?;
        let ext = response
            .content_type
            .as_deref()
            .and_then(extension_from_content_type)
            .or_else(|| extension_from_url(image_url))
            .unwrap_or("png");
        let path = self.path_for(&stem, ext);

        if let Some(existing) = self.vault.get_file_by_path(&path).await? {
            if existing.size > 0 {
                return Ok(path);
            }
            self.vault.delete(&path).await?;
        }

        if !self.folder.is_empty() {
            self.vault.create_folder(&self.folder).await?;
        }
        self.vault.create_binary(&path, &response.bytes).await?;

        tracing::debug!(path = %path, bytes = response.bytes.len(), "saved image to vault");
        Ok(path)
    }

    fn path_for(&self, stem: &str, ext: &str) -> String {
        if self.folder.is_empty() { format!("{stem}.{ext}") } else { format!("{}/{stem}.{ext}", self.folder) }
    }
}

fn file_stem(image_url: &str) -> String {
    let digest = Sha256::digest(image_url.as_bytes());
    hex::encode(digest)[..16].to_string()
}

fn extension_from_url(image_url: &str) -> Option<&'static str> {
    let parsed = url::Url::parse(image_url).ok()?;
    let ext = parsed.path().rsplit_once('.')?.1.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().copied().find(|known| *known == ext)
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "image/avif" => Some("avif"),
        "image/bmp" => Some("bmp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(root: &Path) -> (Arc<FsVault>, VaultImageStore) {
        let vault = Arc::new(FsVault::new(root));
        let fetch = FetchClient::new(FetchConfig::default()).unwrap();
        let store = VaultImageStore::new(vault.clone(), fetch, "images/");
        (vault, store)
    }

    #[tokio::test]
    async fn test_fs_vault_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsVault::new(dir.path());

        vault.create_folder("a/b").await.unwrap();
        let file = vault.create_binary("a/b/c.bin", b"abc").await.unwrap();
        assert_eq!(file.size, 3);
        assert_eq!(vault.read_binary("a/b/c.bin").await.unwrap(), b"abc");
        assert!(vault.create_binary("a/b/c.bin", b"again").await.is_err());

        vault.delete("a/b/c.bin").await.unwrap();
        assert_eq!(vault.get_file_by_path("a/b/c.bin").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fs_vault_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsVault::new(dir.path());
        assert!(matches!(vault.read_binary("../secret").await, Err(Error::Vault(_))));
    }

    #[tokio::test]
    async fn test_save_downloads_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cover"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![1u8, 2, 3])
                    .insert_header("content-type", "image/jpeg"),
            )
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (vault, store) = store(dir.path());
        let url = format!("{}/cover", server.uri());

        let first = store.save(&url).await.unwrap();
        assert!(first.starts_with("images/"));
        assert!(first.ends_with(".jpg"));
        assert_eq!(vault.read_binary(&first).await.unwrap(), vec![1, 2, 3]);

        // No extension in the URL, so the body is fetched again but the file is reused.
        let second = store.save(&url).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_save_reuses_file_when_url_has_extension() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8; 4]))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (_vault, store) = store(dir.path());
        let url = format!("{}/a.png", server.uri());

        let first = store.save(&url).await.unwrap();
        let second = store.save(&url).await.unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_save_replaces_empty_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 5]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (vault, store) = store(dir.path());
        let url = format!("{}/b.gif", server.uri());
        let expected = format!("images/{}.gif", file_stem(&url));
        vault.create_folder("images").await.unwrap();
        vault.create_binary(&expected, b"").await.unwrap();

        let saved = store.save(&url).await.unwrap();
        assert_eq!(saved, expected);
        assert_eq!(vault.read_binary(&saved).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_save_rejects_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let (_vault, store) = store(dir.path());
        assert!(matches!(store.save("data:image/png;base64,AAAA").await, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(extension_from_url("https://x.com/a/B.JPEG?w=1"), Some("jpeg"));
        assert_eq!(extension_from_url("https://x.com/a/page.html"), None);
        assert_eq!(extension_from_content_type("image/svg+xml; charset=utf-8"), Some("svg"));
        assert_eq!(extension_from_content_type("text/html"), None);
        assert_eq!(file_stem("https://x.com/a.png").len(), 16);
    }
}
