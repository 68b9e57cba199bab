//! Page text extraction
//!
//! A small script snapshots the rendered DOM inside the page (marking elements
//! hidden by computed style); the snapshot is then parsed with `scraper` and
//! run through the content-selection strategies and text cleaning.

pub mod clean;
pub mod extractors;
pub mod js_scripts;
pub mod page_info;

// Re-export commonly used types
pub use clean::{clean_text, word_count};
pub use extractors::{Strategy, select_content, visible_text};
pub use js_scripts::{HIDDEN_MARKER, SNAPSHOT_SCRIPT};
pub use page_info::{PageExtraction, PageSnapshot, extract_page};
