//! Extraction record produced for every harvested page

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::clean::{clean_text, word_count};
use super::extractors::{ExtractError, select_content};

/// Serialized state of a rendered page, as returned by `SNAPSHOT_SCRIPT`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Final URL after redirects
    #[serde(default)]
    pub url: String,
    /// `document.title`
    #[serde(default)]
    pub title: String,
    /// `document.documentElement.outerHTML` with hidden elements marked
    #[serde(default)]
    pub html: String,
}

/// Text extracted from one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageExtraction {
    pub title: String,
    pub url: String,
    /// Cleaned visible text
    pub content: String,
    /// Whitespace-delimited tokens in `content`
    pub word_count: usize,
    pub extracted_at: DateTime<Utc>,
}

impl PageExtraction {
    /// Record with no content, used when extraction cannot proceed
    pub fn empty(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: String::new(),
            word_count: 0,
            extracted_at: Utc::now(),
        }
    }
}

fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document.select(&selector).next()?.text().collect::<String>();
    Some(clean_text(&title))
}

fn try_extract(snapshot: &PageSnapshot, min_chars: usize) -> Result<PageExtraction, ExtractError> {
    let document = Html::parse_document(&snapshot.html);
    let (strategy, content) = select_content(&document, &snapshot.url, min_chars)?;

    let title = match clean_text(&snapshot.title) {
        title if title.is_empty() => document_title(&document).unwrap_or_default(),
        title => title,
    };

    debug!(
        "Extracted {} chars from {} via {:?}",
        content.len(),
        snapshot.url,
        strategy
    );

    Ok(PageExtraction {
        title,
        url: snapshot.url.clone(),
        word_count: word_count(&content),
        content,
        extracted_at: Utc::now(),
    })
}

/// Extract cleaned text from a page snapshot
///
/// Never fails: an extraction error degrades to an empty-content record so the
/// harvest still reports the page. Degraded records are logged at warn.
pub fn extract_page(snapshot: &PageSnapshot, min_chars: usize) -> PageExtraction {
    match try_extract(snapshot, min_chars) {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!("Extraction degraded to empty content for {}: {}", snapshot.url, e);
            PageExtraction::empty(snapshot.url.clone(), clean_text(&snapshot.title))
        }
    }
}
