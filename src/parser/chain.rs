//! Extraction fallback chain
//!
//! A listing's title, company and location are resolved by a fixed sequence
//! of strategies. Each strategy produces a partial [`FieldSet`]; a field
//! keeps the first usable value any strategy yields. Later strategies only
//! run while something is still missing.

use std::fmt;

use crate::parser::sanitize::{clean_value, normalize_location, normalize_title};

/// Extraction strategies in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// `JobPosting` structured data embedded in the detail page
    StructuredData,
    /// Detail page selectors, then the hints read off the search card
    RenderedDom,
    /// Login-independent rendering fetched over plain HTTP
    GuestEndpoint,
}

impl Strategy {
    pub const ORDER: [Strategy; 3] = [
        Strategy::StructuredData,
        Strategy::RenderedDom,
        Strategy::GuestEndpoint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructuredData => "structured_data",
            Self::RenderedDom => "rendered_dom",
            Self::GuestEndpoint => "guest_endpoint",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partially resolved listing fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
}

impl FieldSet {
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.company.is_some() && self.location.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.company.is_none() && self.location.is_none()
    }

    /// Fill every missing field from `other`, keeping values already present
    ///
    /// Returns the number of fields that were filled.
    pub fn fill_missing(&mut self, other: FieldSet) -> usize {
        let mut filled = 0;
        for (slot, value) in [
            (&mut self.title, other.title),
            (&mut self.company, other.company),
            (&mut self.location, other.location),
        ] {
            if slot.is_none() {
                if let Some(value) = value.as_deref().and_then(clean_value) {
                    *slot = Some(value);
                    filled += 1;
                }
            }
        }
        filled
    }

    /// Names of the fields still unresolved, for logging
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("title");
        }
        if self.company.is_none() {
            missing.push("company");
        }
        if self.location.is_none() {
            missing.push("location");
        }
        missing
    }

    /// Apply the defaults for unresolved fields and normalize the result
    ///
    /// Title never gets a default; company becomes empty; location falls back
    /// to the location the search was run for.
    pub fn resolve(self, requested_location: &str) -> ResolvedFields {
        ResolvedFields {
            title: normalize_title(self.title.as_deref().unwrap_or_default()),
            company: self.company.unwrap_or_default(),
            location: normalize_location(
                self.location.as_deref().unwrap_or(requested_location),
            ),
        }
    }
}

/// Final field values of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFields {
    pub title: String,
    pub company: String,
    pub location: String,
}

/// First usable value in priority order
pub fn first_present<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .find_map(|value| clean_value(&value))
}
