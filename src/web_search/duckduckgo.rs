//! DuckDuckGo lite HTML backend
//!
//! The lite result page has no stable markup, so URLs are recovered in two
//! tiers:
//! 1. every `uddg=<percent-encoded target>` redirect parameter in the raw body
//! 2. only if tier 1 finds nothing: absolute external `<a href>` targets
//!
//! Links back to DuckDuckGo itself are dropped in both tiers.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::SearchBackend;
use super::types::{SearchError, SearchSource};
use crate::SearchConfig;
use crate::utils::constants::CHROME_USER_AGENT;

const PROVIDER_DOMAIN: &str = "duckduckgo.com";

static UDDG_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn uddg_pattern() -> Option<&'static Regex> {
    UDDG_PATTERN
        .get_or_init(|| Regex::new(r#"uddg=([^&"'\s<>]+)"#).ok())
        .as_ref()
}

pub struct DuckDuckGoBackend {
    client: Client,
    endpoint: String,
    limit: usize,
    timeout_ms: u64,
}

impl DuckDuckGoBackend {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(CHROME_USER_AGENT)
            .build()
            .map_err(|e| SearchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.duckduckgo_endpoint.clone(),
            limit: config.results_per_backend,
            timeout_ms: config.request_timeout_secs * 1000,
        })
    }
}

/// True for URLs on the search provider's own domain
fn is_provider_url(candidate: &str) -> bool {
    match Url::parse(candidate).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) {
        Some(host) => host == PROVIDER_DOMAIN || host.ends_with(&format!(".{PROVIDER_DOMAIN}")),
        None => candidate.contains(PROVIDER_DOMAIN),
    }
}

fn redirect_targets(html: &str) -> Vec<String> {
    let Some(pattern) = uddg_pattern() else {
        return Vec::new();
    };
    pattern
        .captures_iter(html)
        .filter_map(|caps| urlencoding::decode(&caps[1]).ok().map(|d| d.into_owned()))
        .filter(|target| target.starts_with("http") && !is_provider_url(target))
        .collect()
}

fn anchor_targets(html: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| href.starts_with("http://") || href.starts_with("https://"))
        .filter(|href| {
            Url::parse(href).is_ok_and(|u| u.host_str().is_some()) && !is_provider_url(href)
        })
        .map(str::to_string)
        .collect()
}

/// Recover result URLs from a lite result page, deduplicated, at most `limit`
pub fn parse_lite_results(html: &str, limit: usize) -> Vec<String> {
    let mut targets = redirect_targets(html);
    if targets.is_empty() {
        targets = anchor_targets(html);
    }

    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|url| seen.insert(url.clone()))
        .take(limit)
        .collect()
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn source(&self) -> SearchSource {
        SearchSource::DuckDuckGo
    }

    async fn fetch(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(e, self.timeout_ms))?;

        if !response.status().is_success() {
            return Err(SearchError::ApiError {
                status: response.status().as_u16(),
                message: "DuckDuckGo request failed".to_string(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let urls = parse_lite_results(&html, self.limit);
        debug!("DuckDuckGo returned {} URLs for '{}'", urls.len(), query);
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_redirect_parameters() {
        let html = r#"
            <a href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2Flearn&amp;rut=abc">Learn</a>
            <a href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdoc.rust-lang.org%2Fbook%2F&amp;rut=def">Book</a>
            <a href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fduckduckgo.com%2Fsettings&amp;rut=x">Settings</a>
        "#;
        assert_eq!(
            parse_lite_results(html, 3),
            vec![
                "https://www.rust-lang.org/learn".to_string(),
                "https://doc.rust-lang.org/book/".to_string(),
            ]
        );
    }

    #[test]
    fn redirect_tier_wins_over_anchors() {
        let html = r#"
            <a href="https://plain.example.com/">Plain</a>
            <a href="/l/?uddg=https%3A%2F%2Fredirect.example.com%2F">Redirect</a>
        "#;
        assert_eq!(
            parse_lite_results(html, 3),
            vec!["https://redirect.example.com/".to_string()]
        );
    }

    #[test]
    fn falls_back_to_external_anchors() {
        let html = r#"
            <a href="https://duckduckgo.com/html/">Next</a>
            <a href="/lite/?q=rust&amp;s=20">More</a>
            <a href="https://one.example.com/a?x=1&amp;y=2">One</a>
            <a href="https://two.example.com/">Two</a>
            <a href="https://one.example.com/a?x=1&amp;y=2">One again</a>
            <a href="https://three.example.com/">Three</a>
            <a href="https://four.example.com/">Four</a>
            <a href="https://five.example.com/">Five</a>
        "#;
        assert_eq!(
            parse_lite_results(html, 3),
            vec![
                "https://one.example.com/a?x=1&y=2".to_string(),
                "https://two.example.com/".to_string(),
                "https://three.example.com/".to_string(),
            ]
        );
    }

    #[test]
    fn no_links_is_empty() {
        assert!(parse_lite_results("<html><body>No results.</body></html>", 3).is_empty());
    }
}
