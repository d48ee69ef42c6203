//! Embedded `JobPosting` structured data
//!
//! Listing pages usually carry a schema.org `JobPosting` object in a
//! `<script type="application/ld+json">` block. When present it is the most
//! reliable source of the three fields, since it does not depend on the
//! page's class names.

use scraper::Html;
use serde_json::Value;

use crate::parser::chain::FieldSet;
use crate::parser::sanitize::clean_value;
use crate::parser::selectors::ld_json;

/// Extract title, organization and location from structured data
///
/// Every block is tried in document order; malformed JSON is skipped. The
/// first `JobPosting` object found wins.
pub fn extract_job_posting(document: &Html) -> FieldSet {
    document
        .select(ld_json())
        .filter_map(|script| {
            let raw = script.text().collect::<String>();
            match serde_json::from_str::<Value>(raw.trim()) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed ld+json block");
                    None
                }
            }
        })
        .find_map(|value| find_job_posting(&value).map(fields_from))
        .unwrap_or_default()
}

/// Find the first object typed `JobPosting`, descending into arrays and `@graph`
fn find_job_posting(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_job_posting),
        Value::Object(map) => {
            if is_job_posting(map.get("@type")) {
                return Some(value);
            }
            map.get("@graph").and_then(find_job_posting)
        }
        _ => None,
    }
}

fn is_job_posting(kind: Option<&Value>) -> bool {
    match kind {
        Some(Value::String(s)) => s == "JobPosting",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("JobPosting")),
        _ => false,
    }
}

fn fields_from(posting: &Value) -> FieldSet {
    FieldSet {
        title: posting.get("title").and_then(text_of),
        company: posting
            .get("hiringOrganization")
            .and_then(|org| text_of(org).or_else(|| org.get("name").and_then(text_of))),
        location: posting.get("jobLocation").and_then(location_of),
    }
}

/// `jobLocation` may be a single `Place` or a list of them
fn location_of(value: &Value) -> Option<String> {
    match value {
        Value::Array(places) => places.iter().find_map(location_of),
        Value::Object(_) => {
            let address = value.get("address")?;
            let locality = address.get("addressLocality").and_then(text_of);
            let country = address
                .get("addressCountry")
                .and_then(|c| text_of(c).or_else(|| c.get("name").and_then(text_of)));

            match (locality, country) {
                (Some(locality), Some(country)) => Some(format!("{locality}, {country}")),
                (Some(only), None) | (None, Some(only)) => Some(only),
                (None, None) => None,
            }
        }
        _ => None,
    }
}

fn text_of(value: &Value) -> Option<String> {
    value.as_str().and_then(clean_value)
}
