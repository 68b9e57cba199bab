//! Content selection strategies over a rendered-page snapshot
//!
//! Three strategies, tried in order:
//! 1. semantic / content-container selectors, first one yielding enough text wins
//! 2. known encyclopedia hosts, their content element wins unconditionally
//! 3. the whole body minus navigation, chrome, ads and comment regions

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

use super::clean::clean_text;
use super::js_scripts::HIDDEN_MARKER;

/// Probed in order by the content-container strategy
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    "#content",
    ".content",
    "#main-content",
    ".main-content",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".article-body",
    "#main",
    ".main",
];

/// (host suffix, content element) pairs trusted without a length gate
const ENCYCLOPEDIA_CONTAINERS: &[(&str, &str)] = &[("wikipedia.org", "#mw-content-text")];

/// Regions dropped from the body by the fallback strategy
const NOISE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "iframe",
    "nav",
    "header",
    "footer",
    "aside",
    "[role=\"navigation\"]",
    "[role=\"banner\"]",
    "[role=\"contentinfo\"]",
    "[role=\"complementary\"]",
    ".advertisement",
    ".ads",
    ".ad",
    ".social-share",
    ".share-buttons",
    ".comments",
    "#comments",
    ".related",
    ".related-posts",
    ".sidebar",
];

/// Elements whose text is never visible
const NON_TEXT_TAGS: &[&str] = &["script", "style", "noscript"];

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Which strategy produced the content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ContentContainer,
    Encyclopedia,
    BodyFallback,
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// True when text directly inside `element` must be skipped
fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if NON_TEXT_TAGS.contains(&value.name()) {
        return true;
    }
    if value.attr(HIDDEN_MARKER).is_some() || value.attr("hidden").is_some() {
        return true;
    }
    // Snapshots taken without the marker script still carry inline styles
    value.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

/// Visible text under `root`, one space between accepted text nodes
///
/// A text node is rejected when its nearest element ancestor is hidden or a
/// script/style/noscript container, when it is blank, or when it sits inside
/// one of the `excluded` subtrees.
pub fn visible_text(root: ElementRef<'_>, excluded: &[ElementRef<'_>]) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        if is_hidden(parent) {
            continue;
        }
        if !excluded.is_empty()
            && node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| excluded.contains(&ancestor))
        {
            continue;
        }
        parts.push(trimmed);
    }

    parts.join(" ")
}

fn encyclopedia_container(page_url: &str) -> Option<&'static str> {
    let host = Url::parse(page_url).ok()?.host_str()?.to_ascii_lowercase();
    ENCYCLOPEDIA_CONTAINERS
        .iter()
        .find(|(suffix, _)| host == *suffix || host.ends_with(&format!(".{suffix}")))
        .map(|(_, selector)| *selector)
}

/// Pick the content of a parsed page and return it cleaned
pub fn select_content(
    document: &Html,
    page_url: &str,
    min_chars: usize,
) -> Result<(Strategy, String), ExtractError> {
    // 1. Content containers, gated on length
    for selector in CONTENT_SELECTORS {
        let selector = parse_selector(selector)?;
        for element in document.select(&selector) {
            let text = clean_text(&visible_text(element, &[]));
            if text.chars().count() >= min_chars {
                return Ok((Strategy::ContentContainer, text));
            }
        }
    }

    // 2. Known encyclopedia layout
    if let Some(container) = encyclopedia_container(page_url) {
        let selector = parse_selector(container)?;
        if let Some(element) = document.select(&selector).next() {
            return Ok((Strategy::Encyclopedia, clean_text(&visible_text(element, &[]))));
        }
    }

    // 3. Body without boilerplate regions
    let body_selector = parse_selector("body")?;
    let body = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut excluded = Vec::new();
    for selector in NOISE_SELECTORS {
        let selector = parse_selector(selector)?;
        excluded.extend(body.select(&selector));
    }

    Ok((Strategy::BodyFallback, clean_text(&visible_text(body, &excluded))))
}
