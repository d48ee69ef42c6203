//! Merge policies for combining stored and newly collected postings
//!
//! Both policies are pure, never drop a URL present in either input, and are
//! idempotent: merging the same incoming batch twice gives the same table as
//! merging it once.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::Posting;

/// Merge for the local rolling store
///
/// Per URL the row with the longest company wins, then the most recent
/// `collected_at`, then the later row (incoming over existing). The result is
/// sorted by `collected_at`, company, title and URL.
pub fn merge_local(existing: Vec<Posting>, incoming: Vec<Posting>) -> Vec<Posting> {
    let mut by_url: HashMap<String, Posting> = HashMap::new();

    for candidate in existing.into_iter().chain(incoming) {
        let keep_current = by_url
            .get(&candidate.url)
            .is_some_and(|current| local_rank(&candidate, current) == Ordering::Less);
        if !keep_current {
            by_url.insert(candidate.url.clone(), candidate);
        }
    }

    let mut merged: Vec<Posting> = by_url.into_values().collect();
    merged.sort_by(|a, b| {
        a.collected_at
            .cmp(&b.collected_at)
            .then_with(|| a.company.cmp(&b.company))
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.url.cmp(&b.url))
    });
    merged
}

/// Compare a candidate against the current row for the same URL
fn local_rank(candidate: &Posting, current: &Posting) -> Ordering {
    candidate
        .company
        .chars()
        .count()
        .cmp(&current.company.chars().count())
        .then_with(|| candidate.collected_at.cmp(&current.collected_at))
}

/// Merge for the remote archive
///
/// Rows keep their original position; an incoming row replaces the stored
/// row for the same URL in place, and new URLs are appended in the order
/// they were collected.
pub fn merge_archive(existing: Vec<Posting>, incoming: Vec<Posting>) -> Vec<Posting> {
    let mut merged: Vec<Posting> = Vec::with_capacity(existing.len() + incoming.len());
    let mut position: HashMap<String, usize> = HashMap::new();

    for posting in existing.into_iter().chain(incoming) {
        match position.get(&posting.url).copied() {
            Some(index) => merged[index] = posting,
            None => {
                position.insert(posting.url.clone(), merged.len());
                merged.push(posting);
            }
        }
    }

    merged
}
