//! URL canonicalization and listing-id extraction
//!
//! Every persisted posting is keyed by its canonical URL: absolute http(s),
//! no query string, no fragment and no trailing slash. Job-search listing
//! URLs additionally collapse to `{site}/jobs/view/{id}`, whatever tracking
//! slug or search-page wrapper they were discovered through.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::utils::error::FetchError;

lazy_static! {
    // Matches: /jobs/view/3912345678 or /jobs/view/data-scientist-at-acme-3912345678
    static ref VIEW_PATTERN: Regex = Regex::new(r"/jobs/view/(?:[^/?#]*-)?(\d{6,})").unwrap();
    // Matches search-page wrappers: ?currentJobId=3912345678
    static ref CURRENT_JOB_PATTERN: Regex = Regex::new(r"[?&]currentJobId=(\d{6,})").unwrap();
    // Matches guest renderings: /jobPosting/3912345678
    static ref GUEST_PATTERN: Regex = Regex::new(r"/jobPosting/(\d{6,})").unwrap();
}

/// Canonicalize an absolute URL
///
/// Returns `None` for relative, non-http(s) or unparsable input.
///
/// # Examples
///
/// ```
/// use jobtrail::crawler::url::canonicalize_url;
///
/// let url = canonicalize_url("https://jobs.lever.co/acme/42/?lever-source=li#apply").unwrap();
/// assert_eq!(url, "https://jobs.lever.co/acme/42");
/// ```
pub fn canonicalize_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    canonical_from(parsed)
}

fn canonical_from(mut parsed: Url) -> Option<String> {
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }

    parsed.set_query(None);
    parsed.set_fragment(None);

    let mut canonical = parsed.to_string();
    if parsed.path() != "/" {
        while canonical.ends_with('/') {
            canonical.pop();
        }
    }

    Some(canonical)
}

/// Extract the numeric listing identifier from a listing URL
///
/// Looks at the raw URL, so search-page wrappers carrying
/// `currentJobId` are recognised before their query is stripped.
pub fn extract_listing_id(url: &str) -> Option<u64> {
    [&*VIEW_PATTERN, &*CURRENT_JOB_PATTERN, &*GUEST_PATTERN]
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Canonical listing URL for a numeric identifier
pub fn listing_url(site: &str, id: u64) -> String {
    format!("{}/jobs/view/{id}", site.trim_end_matches('/'))
}

/// Canonicalize a listing link discovered on the job-search site
///
/// Listing links collapse to [`listing_url`]. Off-site links and on-site
/// pages without a listing id (company pages, profiles) are rejected.
pub fn canonical_listing_link(raw: &str, site: &str) -> Option<String> {
    let absolute = Url::parse(site).ok()?.join(raw.trim()).ok()?;
    let site_host = Url::parse(site).ok()?.host_str()?.to_string();
    let registrable = site_host.trim_start_matches("www.");

    if !crate::utils::host_matches(absolute.as_str(), registrable) {
        return None;
    }

    extract_listing_id(absolute.as_str()).map(|id| listing_url(site, id))
}

/// Build the login-independent rendering URL for a listing
pub fn guest_listing_url(template: &str, id: u64) -> Result<String, FetchError> {
    let url = template.replace("{id}", &id.to_string());
    Url::parse(&url).map_err(|_| FetchError::InvalidUrl(url.clone()))?;
    Ok(url)
}

/// Build the search-results URL for a query and location
pub fn search_url(site: &str, query: &str, location: &str) -> Result<String, FetchError> {
    let base = format!("{}/jobs/search/", site.trim_end_matches('/'));
    let mut url = Url::parse(&base).map_err(|_| FetchError::InvalidUrl(base.clone()))?;
    url.query_pairs_mut()
        .append_pair("keywords", query)
        .append_pair("location", location);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://www.linkedin.com";

    #[test]
    fn test_canonicalize_strips_query_and_fragment() {
        assert_eq!(
            canonicalize_url("https://boards.greenhouse.io/acme/jobs/123?gh_src=abc#top").unwrap(),
            "https://boards.greenhouse.io/acme/jobs/123"
        );
        assert_eq!(
            canonicalize_url("https://boards.greenhouse.io/acme/").unwrap(),
            "https://boards.greenhouse.io/acme"
        );
        assert_eq!(
            canonicalize_url("https://example.com/?q=1").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_canonicalize_rejects_relative_and_foreign_schemes() {
        assert!(canonicalize_url("/jobs/view/123").is_none());
        assert!(canonicalize_url("mailto:jobs@acme.com").is_none());
        assert!(canonicalize_url("").is_none());
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let once = canonicalize_url("https://jobs.lever.co/acme/42/?src=x").unwrap();
        assert_eq!(canonicalize_url(&once).unwrap(), once);
    }

    #[test]
    fn test_extract_listing_id() {
        assert_eq!(
            extract_listing_id("https://www.linkedin.com/jobs/view/3912345678/?trk=abc"),
            Some(3_912_345_678)
        );
        assert_eq!(
            extract_listing_id("https://il.linkedin.com/jobs/view/data-scientist-at-acme-3912345678"),
            Some(3_912_345_678)
        );
        assert_eq!(
            extract_listing_id("https://www.linkedin.com/jobs/search/?currentJobId=3912345678&geoId=1"),
            Some(3_912_345_678)
        );
        assert_eq!(extract_listing_id("https://www.linkedin.com/company/acme"), None);
    }

    #[test]
    fn test_canonical_listing_link() {
        assert_eq!(
            canonical_listing_link("/jobs/view/data-scientist-3912345678/?refId=xyz", SITE).unwrap(),
            "https://www.linkedin.com/jobs/view/3912345678"
        );
        assert_eq!(
            canonical_listing_link("https://il.linkedin.com/jobs/view/3912345678", SITE).unwrap(),
            "https://www.linkedin.com/jobs/view/3912345678"
        );
        assert!(canonical_listing_link("https://tracker.example.com/jobs/view/3912345678", SITE).is_none());
        assert!(canonical_listing_link("/company/acme", SITE).is_none());
        assert!(canonical_listing_link("https://www.linkedin.com/jobs/search/?keywords=ds", SITE).is_none());
    }

    #[test]
    fn test_guest_and_search_urls() {
        assert_eq!(
            guest_listing_url("https://www.linkedin.com/jobs-guest/jobs/api/jobPosting/{id}", 42_000_000).unwrap(),
            "https://www.linkedin.com/jobs-guest/jobs/api/jobPosting/42000000"
        );
        assert!(guest_listing_url("not a url {id}", 1).is_err());

        let url = search_url(SITE, "Data Scientist", "Tel Aviv").unwrap();
        assert_eq!(
            url,
            "https://www.linkedin.com/jobs/search/?keywords=Data+Scientist&location=Tel+Aviv"
        );
    }
}
