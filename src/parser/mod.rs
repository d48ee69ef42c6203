//! HTML parsing and listing field extraction
//!
//! This module turns rendered search pages and listing detail pages into
//! candidate URLs and listing fields, and normalizes the extracted text.

pub mod chain;
pub mod html;
pub mod sanitize;
pub mod selectors;
pub mod structured;

pub use chain::{first_present, FieldSet, ResolvedFields, Strategy};
pub use html::{CardParser, DetailExtractor, ParsedCard};
pub use sanitize::{normalize_location, normalize_title};

use scraper::Html;

/// Run the page-local strategies (structured data, then selectors) on one document
///
/// Returns the merged fields and the strategies that contributed a value.
pub fn extract_page(html: &str, detail: &DetailExtractor) -> (FieldSet, Vec<Strategy>) {
    let document = Html::parse_document(html);
    let mut fields = FieldSet::default();
    let mut contributed = Vec::new();

    if fields.fill_missing(structured::extract_job_posting(&document)) > 0 {
        contributed.push(Strategy::StructuredData);
    }
    if !fields.is_complete() && fields.fill_missing(detail.extract(&document)) > 0 {
        contributed.push(Strategy::RenderedDom);
    }

    (fields, contributed)
}
