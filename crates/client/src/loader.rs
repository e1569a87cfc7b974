//! Image loading for dimension measurement.
//!
//! Keys may be `http(s)` URLs, `data:` URIs, or vault paths of previously
//! saved images. Raster formats are measured from their headers; SVG sizes
//! come from the root element's attributes.

use std::io::Cursor;
use std::sync::{Arc, LazyLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;

use crate::fetch::FetchClient;
use crate::vault::Vault;
use linkcard_core::{ImageLoadError, ImageLoader};

/// Size browsers give an SVG that declares neither width/height nor viewBox.
const SVG_FALLBACK_SIZE: (u32, u32) = (300, 150);

static SVG_ROOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<svg\b[^>]*>").expect("valid regex"));
static SVG_WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\swidth\s*=\s*["']\s*([0-9.]+)\s*(px)?\s*["']"#).expect("valid regex"));
static SVG_HEIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\sheight\s*=\s*["']\s*([0-9.]+)\s*(px)?\s*["']"#).expect("valid regex"));
static SVG_VIEWBOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\sviewbox\s*=\s*["']\s*[-0-9.]+[\s,]+[-0-9.]+[\s,]+([0-9.]+)[\s,]+([0-9.]+)\s*["']"#)
        .expect("valid regex")
});

/// Loads images over HTTP, from data URIs, or from the vault.
#[derive(Clone)]
pub struct HttpImageLoader {
    fetch: FetchClient,
    vault: Option<Arc<dyn Vault>>,
}

impl HttpImageLoader {
    pub fn new(fetch: FetchClient) -> Self {
        Self { fetch, vault: None }
    }

    /// Also resolve non-URL keys as vault paths.
    pub fn with_vault(mut self, vault: Arc<dyn Vault>) -> Self {
        self.vault = Some(vault);
        self
    }
}

#[async_trait::async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, key: &str) -> Result<(u32, u32), ImageLoadError> {
        if let Some(rest) = key.strip_prefix("data:") {
            let (mime, bytes) = decode_data_uri(rest).map_err(|reason| ImageLoadError::new(key, reason))?;
            return measure(&bytes, Some(&mime)).map_err(|reason| ImageLoadError::new(key, reason));
        }

        if key.starts_with("http://") || key.starts_with("https://") {
            let response = self
                .fetch
                .fetch_image(key)
                .await
                .map_err(|e| ImageLoadError::new(key, e.to_string()))?;
            return measure(&response.bytes, response.content_type.as_deref())
                .map_err(|reason| ImageLoadError::new(key, reason));
        }

        let Some(vault) = &self.vault else {
            return Err(ImageLoadError::new(key, "unsupported image reference"));
        };
        let bytes = vault
            .read_binary(key)
            .await
            .map_err(|e| ImageLoadError::new(key, e.to_string()))?;
        let hint = key.ends_with(".svg").then_some("image/svg+xml");
        measure(&bytes, hint).map_err(|reason| ImageLoadError::new(key, reason))
    }
}

/// Split the part after `data:` into its media type and decoded payload.
fn decode_data_uri(rest: &str) -> Result<(String, Vec<u8>), String> {
    let (header, payload) = rest.split_once(',').ok_or("malformed data URI")?;
    let mime = header.split(';').next().unwrap_or_default().to_ascii_lowercase();

    let bytes = if header.to_ascii_lowercase().ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| format!("invalid base64: {e}"))?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };

    Ok((mime, bytes))
}

/// Natural `(width, height)` of an encoded image.
fn measure(bytes: &[u8], content_type: Option<&str>) -> Result<(u32, u32), String> {
    if bytes.is_empty() {
        return Err("empty image body".into());
    }

    if content_type.is_some_and(|ct| ct.contains("svg")) || looks_like_svg(bytes) {
        return svg_dimensions(&String::from_utf8_lossy(bytes)).ok_or_else(|| "no <svg> element found".to_string());
    }

    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| format!("failed to detect image format: {e}"))?
        .into_dimensions()
        .map_err(|e| format!("failed to decode image: {e}"))
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_ascii_lowercase();
    let head = head.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

fn svg_dimensions(svg: &str) -> Option<(u32, u32)> {
    let root = SVG_ROOT.find(svg)?.as_str();
    let attr = |re: &Regex| -> Option<f64> { re.captures(root)?.get(1)?.as_str().parse().ok() };

    if let (Some(width), Some(height)) = (attr(&SVG_WIDTH), attr(&SVG_HEIGHT)) {
        return Some((width.round() as u32, height.round() as u32));
    }

    if let Some(caps) = SVG_VIEWBOX.captures(root) {
        let width: f64 = caps.get(1)?.as_str().parse().ok()?;
        let height: f64 = caps.get(2)?.as_str().parse().ok()?;
        return Some((width.round() as u32, height.round() as u32));
    }

    Some(SVG_FALLBACK_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchConfig;
    use crate::vault::FsVault;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// 1x1 transparent GIF.
    const GIF_1X1: &str = "R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

    fn loader() -> HttpImageLoader {
        HttpImageLoader::new(FetchClient::new(FetchConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_load_base64_data_uri() {
        let key = format!("data:image/gif;base64,{GIF_1X1}");
        assert_eq!(loader().load(&key).await.unwrap(), (1, 1));
    }

    #[tokio::test]
    async fn test_load_percent_encoded_svg_data_uri() {
        let key = "data:image/svg+xml,%3Csvg%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%20width%3D%2232%22%20height%3D%2216%22%3E%3C%2Fsvg%3E";
        assert_eq!(loader().load(key).await.unwrap(), (32, 16));
    }

    #[tokio::test]
    async fn test_load_garbage_fails_with_key() {
        let err = loader().load("data:image/png;base64,AAAA").await.unwrap_err();
        assert!(err.key.starts_with("data:image/png"));
    }

    #[tokio::test]
    async fn test_load_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(STANDARD.decode(GIF_1X1).unwrap())
                    .insert_header("content-type", "image/gif"),
            )
            .mount(&server)
            .await;

        let dims = loader().load(&format!("{}/pixel.gif", server.uri())).await.unwrap();
        assert_eq!(dims, (1, 1));
    }

    #[tokio::test]
    async fn test_load_http_error_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(loader().load(&format!("{}/gone.png", server.uri())).await.is_err());
    }

    #[tokio::test]
    async fn test_load_from_vault() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FsVault::new(dir.path()));
        vault
            .create_binary("logo.svg", br#"<svg viewBox="0 0 64 48"></svg>"#)
            .await
            .unwrap();

        let loader = loader().with_vault(vault);
        assert_eq!(loader.load("logo.svg").await.unwrap(), (64, 48));
    }

    #[tokio::test]
    async fn test_relative_key_without_vault_fails() {
        assert!(loader().load("images/a.png").await.is_err());
    }

    #[test]
    fn test_svg_dimensions() {
        assert_eq!(svg_dimensions(r#"<svg width="120px" height="60"></svg>"#), Some((120, 60)));
        assert_eq!(svg_dimensions(r#"<svg viewBox="0 0 24 24"/>"#), Some((24, 24)));
        assert_eq!(svg_dimensions(r#"<svg width="100%"></svg>"#), Some(SVG_FALLBACK_SIZE));
        assert_eq!(svg_dimensions("<html></html>"), None);
    }

    #[test]
    fn test_looks_like_svg() {
        assert!(looks_like_svg(b"  <?xml version=\"1.0\"?><svg></svg>"));
        assert!(!looks_like_svg(b"GIF89a"));
    }
}
