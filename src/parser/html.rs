//! Rendered-page parsing for search results and listing details
//!
//! This module reads search-result cards during discovery and the listing
//! fields from a detail page (authenticated or guest rendering).

use scraper::{ElementRef, Html, Selector};

use crate::crawler::url::{canonical_listing_link, extract_listing_id};
use crate::parser::chain::{first_present, FieldSet};
use crate::parser::selectors::{CardSelectors, DetailSelectors};

/// A result card read off the search page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCard {
    /// Canonical listing URL
    pub url: String,
    pub listing_id: Option<u64>,
    /// Title, company and location as shown on the card
    pub hints: FieldSet,
}

/// Parser for search-result pages
pub struct CardParser {
    selectors: CardSelectors,
}

impl CardParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            selectors: CardSelectors::new(),
        }
    }

    /// Parse every result card with a usable on-site link
    ///
    /// Cards are returned in page order; duplicates are not removed here.
    pub fn parse_cards(&self, html: &str, site: &str) -> Vec<ParsedCard> {
        let document = Html::parse_document(html);

        let Some(card_selector) = self
            .selectors
            .card
            .iter()
            .find(|selector| document.select(selector).next().is_some())
        else {
            return Vec::new();
        };

        document
            .select(card_selector)
            .filter_map(|card| self.parse_card(card, site))
            .collect()
    }

    fn parse_card(&self, card: ElementRef<'_>, site: &str) -> Option<ParsedCard> {
        let url = self
            .selectors
            .link
            .iter()
            .flat_map(|selector| card.select(selector))
            .filter_map(|link| link.value().attr("href"))
            .find_map(|href| canonical_listing_link(href, site))?;

        let hints = FieldSet {
            title: first_in(card, self.selectors.title),
            company: first_in(card, self.selectors.company),
            location: first_in(card, self.selectors.location),
        };

        Some(ParsedCard {
            listing_id: extract_listing_id(&url),
            url,
            hints,
        })
    }
}

impl Default for CardParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads listing fields from a detail page
pub struct DetailExtractor {
    selectors: DetailSelectors,
}

impl DetailExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            selectors: DetailSelectors::new(),
        }
    }

    /// Extract whatever fields the page's top card exposes
    pub fn extract(&self, document: &Html) -> FieldSet {
        let root = document.root_element();
        FieldSet {
            title: first_in(root, self.selectors.title),
            company: first_in(root, self.selectors.company),
            location: first_in(root, self.selectors.location),
        }
    }

    /// Parse and extract in one step
    pub fn extract_html(&self, html: &str) -> FieldSet {
        self.extract(&Html::parse_document(html))
    }
}

impl Default for DetailExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// First usable text among priority-ordered selectors
fn first_in(scope: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    first_present(selectors.iter().map(|selector| {
        scope
            .select(selector)
            .next()
            .map(|element| element.text().collect::<String>())
    }))
}
