//! URL-based deduplication
//!
//! The [`SeenSet`] holds every canonical URL already archived. It is rebuilt
//! at the start of each run and grows as collectors report new postings; it
//! is never persisted on its own.

use std::collections::HashSet;

use crate::models::Posting;

/// Canonical URLs already collected
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    urls: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from previously archived postings
    pub fn from_postings<'a, I>(postings: I) -> Self
    where
        I: IntoIterator<Item = &'a Posting>,
    {
        Self {
            urls: postings.into_iter().map(|p| p.url.clone()).collect(),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Record a URL; returns `false` if it was already present
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    /// Keep the postings whose URL is new, recording them as seen
    ///
    /// Duplicates inside `postings` are dropped as well, first occurrence wins.
    pub fn absorb(&mut self, postings: Vec<Posting>) -> Vec<Posting> {
        postings
            .into_iter()
            .filter(|posting| {
                let fresh = self.insert(posting.url.clone());
                if !fresh {
                    tracing::trace!(url = %posting.url, "Skipping already seen URL");
                }
                fresh
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
