//! Metadata and candidate collection from a parsed HTML document.
//!
//! Everything here is synchronous and pure; candidate URLs still have to be
//! verified as loadable before one is accepted.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::visibility::is_visible_and_not_chrome;
use crate::fetch::{origin_favicon, resolve_reference};

/// Where image candidates are looked for, in priority order.
enum ImageSource {
    /// Elements matched directly by the selector.
    Elements(&'static str),
    /// `<img>` elements inside `<noscript>` blocks under the scope selector.
    Noscript(&'static str),
}

const IMAGE_SOURCES: &[ImageSource] = &[
    ImageSource::Elements(r#"[itemtype="http://schema.org/Product"] [itemprop="image"]"#),
    ImageSource::Elements(r#"[itemtype="https://schema.org/Product"] [itemprop="image"]"#),
    ImageSource::Noscript("#main"),
    ImageSource::Elements("#main img"),
    ImageSource::Noscript("main"),
    ImageSource::Elements("main img"),
    ImageSource::Noscript(r#"[role="main"]"#),
    ImageSource::Elements(r#"[role="main"] img"#),
    ImageSource::Noscript("body"),
    ImageSource::Elements("body img"),
];

const FAVICON_SELECTORS: &[&str] = &[
    r#"link[rel="icon"]"#,
    r#"link[rel="shortcut icon"]"#,
    r#"link[rel="apple-touch-icon"]"#,
    r#"link[rel="apple-touch-icon-precomposed"]"#,
];

static BASE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("base[href]").expect("invalid selector"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("invalid selector"));
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("invalid selector"));

/// Text fields and unverified image/favicon candidates of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCandidates {
    pub title: String,
    pub description: String,
    /// Image URLs in priority order, `og:image` first.
    pub images: Vec<String>,
    /// Favicon URLs in priority order, ending with the origin `/favicon.ico`.
    pub favicons: Vec<String>,
}

/// Collect metadata and candidates from `html` fetched from `page_url`.
pub fn collect_candidates(html: &str, page_url: &Url) -> PageCandidates {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);

    let title = meta_property(&document, "og:title")
        .or_else(|| {
            document
                .select(&TITLE)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .or_else(|| page_url.host_str().map(String::from))
        .unwrap_or_default();

    let description = meta_property(&document, "og:description")
        .or_else(|| meta_name(&document, "description"))
        .unwrap_or_default();

    PageCandidates {
        title,
        description,
        images: image_candidates(&document, &base),
        favicons: favicon_candidates(&document, &base),
    }
}

/// Favicon candidates only, for pages scraped by another parser.
pub fn collect_favicons(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);
    favicon_candidates(&document, &base)
}

/// The declared `<base href>`, resolved against the page URL, or the page URL.
fn document_base(document: &Html, page_url: &Url) -> Url {
    document
        .select(&BASE)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

fn meta_property(document: &Html, property: &str) -> Option<String> {
    meta_content(document, &format!(r#"meta[property="{property}"]"#))
}

fn meta_name(document: &Html, name: &str) -> Option<String> {
    meta_content(document, &format!(r#"meta[name="{name}"]"#))
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(String::from)
}

fn image_candidates(document: &Html, base: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();
    let mut push = |candidate: Option<String>| {
        if let Some(url) = candidate
            && seen.insert(url.clone())
        {
            images.push(url);
        }
    };

    push(meta_property(document, "og:image").and_then(|content| resolve_reference(base, &content)));

    for source in IMAGE_SOURCES {
        match source {
            ImageSource::Elements(selector) => {
                let Ok(selector) = Selector::parse(selector) else {
                    continue;
                };
                for element in document.select(&selector) {
                    if is_visible_and_not_chrome(element) {
                        push(element_reference(element).and_then(|src| resolve_reference(base, src)));
                    }
                }
            }
            ImageSource::Noscript(scope) => {
                for src in noscript_images(document, scope) {
                    push(resolve_reference(base, &src));
                }
            }
        }
    }

    images
}

/// Image `src` values inside visible `<noscript>` blocks under `scope`.
///
/// With scripting enabled the parser keeps noscript content as raw text, so
/// that text is parsed again as a fragment when it holds no elements.
fn noscript_images(document: &Html, scope: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(&format!("{scope} noscript")) else {
        return Vec::new();
    };

    let mut sources = Vec::new();
    for noscript in document.select(&selector) {
        if !is_visible_and_not_chrome(noscript) {
            continue;
        }

        let direct: Vec<String> = noscript
            .select(&IMG)
            .filter(|img| is_visible_and_not_chrome(*img))
            .filter_map(|img| img.value().attr("src").map(String::from))
            .collect();
        if !direct.is_empty() {
            sources.extend(direct);
            continue;
        }

        let fragment = Html::parse_fragment(&noscript.text().collect::<String>());
        sources.extend(
            fragment
                .select(&IMG)
                .filter(|img| is_visible_and_not_chrome(*img))
                .filter_map(|img| img.value().attr("src").map(String::from)),
        );
    }
    sources
}

/// The URL-bearing attribute of an image-like element.
fn element_reference(element: ElementRef<'_>) -> Option<&str> {
    let value = element.value();
    match value.name() {
        "meta" => value.attr("content"),
        "link" | "a" => value.attr("href"),
        _ => value.attr("src"),
    }
}

fn favicon_candidates(document: &Html, base: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut favicons = Vec::new();

    let declared = FAVICON_SELECTORS
        .iter()
        .filter_map(|selector| Selector::parse(selector).ok())
        .flat_map(|selector| {
            document
                .select(&selector)
                .filter_map(|el| el.value().attr("href"))
                .filter_map(|href| resolve_reference(base, href))
                .collect::<Vec<_>>()
        });

    for url in declared.chain(origin_favicon(base)) {
        if seen.insert(url.clone()) {
            favicons.push(url);
        }
    }
    favicons
}
