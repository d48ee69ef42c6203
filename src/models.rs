// Core data structures for jobtrail

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collector variant that observed a posting
///
/// Serialized as its display label so the tabular record stays readable.
/// Labels written by older runs that no longer map to a variant are kept
/// verbatim in [`Source::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    Greenhouse,
    Lever,
    SerpApi,
    SearchApi,
    LinkedInBrowser,
    Other(String),
}

impl Source {
    /// Get string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Greenhouse => "Greenhouse",
            Self::Lever => "Lever",
            Self::SerpApi => "LinkedIn (via SerpAPI)",
            Self::SearchApi => "LinkedIn (SearchApi)",
            Self::LinkedInBrowser => "LinkedIn (Browser)",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for Source {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Greenhouse" => Self::Greenhouse,
            "Lever" => Self::Lever,
            "LinkedIn (via SerpAPI)" => Self::SerpApi,
            "LinkedIn (SearchApi)" => Self::SearchApi,
            // Older runs labelled the browser collector after its driver
            "LinkedIn (Browser)" | "LinkedIn (Playwright)" => Self::LinkedInBrowser,
            _ => Self::Other(label),
        }
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        match source {
            Source::Other(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observed job listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub source: Source,
    #[serde(alias = "job_title")]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    /// Canonical URL, the dedup key across sources and runs
    pub url: String,
    pub collected_at: NaiveDate,
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

impl Posting {
    pub fn new(
        source: Source,
        title: impl Into<String>,
        company: impl Into<String>,
        location: impl Into<String>,
        url: impl Into<String>,
        collected_at: NaiveDate,
    ) -> Self {
        Self {
            source,
            title: title.into(),
            company: company.into(),
            location: location.into(),
            url: url.into(),
            collected_at,
            snapshot_id: None,
        }
    }

    /// Tag with the snapshot the posting was collected in
    #[must_use]
    pub fn with_snapshot(mut self, snapshot_id: &str) -> Self {
        self.snapshot_id = Some(snapshot_id.to_string());
        self
    }

    /// Key used to group postings into time series
    pub fn group_key(&self) -> String {
        match &self.snapshot_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => self.collected_at.format("%Y-%m-%d").to_string(),
        }
    }

    /// A posting is incomplete when extraction could not resolve every field
    pub fn is_incomplete(&self) -> bool {
        self.title.is_empty() || self.company.is_empty() || self.location.is_empty()
    }
}

/// Snapshot identifier derived from the run start time
pub fn snapshot_id_at(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%SZ").to_string()
}

/// Postings gathered by one run, sharing a snapshot identifier
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: String,
    pub taken_at: DateTime<Utc>,
    pub postings: Vec<Posting>,
}

impl Snapshot {
    /// Build a snapshot, tagging every posting with its identifier
    pub fn new(taken_at: DateTime<Utc>, postings: Vec<Posting>) -> Self {
        let id = snapshot_id_at(taken_at);
        let postings = postings
            .into_iter()
            .map(|p| p.with_snapshot(&id))
            .collect();
        Self {
            id,
            taken_at,
            postings,
        }
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}
