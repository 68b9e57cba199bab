//! Merging of per-backend URL lists

use std::collections::HashSet;

use super::types::CandidateUrl;

/// Concatenate candidate lists in backend order, keep the first occurrence of
/// each URL and stop at `budget` entries
///
/// Discovery order is the only ordering signal; nothing is scored.
pub fn merge_candidates<I>(lists: I, budget: usize) -> Vec<CandidateUrl>
where
    I: IntoIterator<Item = Vec<CandidateUrl>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for candidate in lists.into_iter().flatten() {
        if merged.len() >= budget {
            break;
        }
        if seen.insert(candidate.url.clone()) {
            merged.push(candidate);
        }
    }

    merged
}

/// `merge_candidates` over bare URL lists
pub fn merge(first: &[String], second: &[String], budget: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    first
        .iter()
        .chain(second)
        .filter(|url| seen.insert(*url))
        .take(budget)
        .cloned()
        .collect()
}
