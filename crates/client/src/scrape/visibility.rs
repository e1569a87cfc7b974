//! Visibility and page-chrome filtering for image candidates.

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

static DISPLAY_NONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)display:\s*none").expect("valid regex"));

/// Whether an element may supply a preview image.
///
/// Rejects elements hidden with an inline `display: none`, and anything
/// inside an element whose id or class mentions "header". Logo images are
/// exempt from both rules on themselves and from the header rule on their
/// ancestors. The root element is always accepted.
pub fn is_visible_and_not_chrome(element: ElementRef<'_>) -> bool {
    let Some(mut ancestor) = parent_element(element) else {
        return true;
    };

    let logo = is_logo_image(element);
    if !logo && (is_hidden(element) || (!is_img(element) && has_header_marker(element))) {
        return false;
    }

    while let Some(grandparent) = parent_element(ancestor) {
        if is_hidden(ancestor) || (!logo && has_header_marker(ancestor)) {
            return false;
        }
        ancestor = grandparent;
    }

    true
}

fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

fn is_img(element: ElementRef<'_>) -> bool {
    element.value().name().eq_ignore_ascii_case("img")
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    element
        .value()
        .attr("style")
        .is_some_and(|style| DISPLAY_NONE.is_match(style))
}

fn is_logo_image(element: ElementRef<'_>) -> bool {
    if !is_img(element) {
        return false;
    }
    let src = element.value().attr("src").unwrap_or_default().to_ascii_lowercase();
    let alt = element.value().attr("alt").unwrap_or_default().to_ascii_lowercase();
    let path = src.split(['?', '#']).next().unwrap_or_default();
    src.contains("logo") || alt.contains("logo") || path.ends_with(".svg")
}

fn has_header_marker(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value.id().is_some_and(|id| id.to_ascii_lowercase().contains("header"))
        || value.classes().any(|class| class.to_ascii_lowercase().contains("header"))
}
