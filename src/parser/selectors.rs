//! CSS selectors for job-search result cards and listing detail pages
//!
//! Each field has a priority-ordered list: the authenticated front-end markup
//! first, then the guest (logged-out) markup, then looser fallbacks.

use lazy_static::lazy_static;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    // Result cards on the search page
    static ref CARD: Vec<Selector> = vec![
        parse_selector!("li.jobs-search-results__list-item"),
        parse_selector!("div.job-card-container"),
        parse_selector!("div.base-card"),
        parse_selector!("li[data-occludable-job-id]"),
    ];

    static ref CARD_LINK: Vec<Selector> = vec![
        parse_selector!("a.base-card__full-link"),
        parse_selector!("a.job-card-list__title"),
        parse_selector!("a.job-card-container__link"),
        parse_selector!("a[href*='/jobs/view/']"),
        parse_selector!("a[href]"),
    ];

    static ref CARD_TITLE: Vec<Selector> = vec![
        parse_selector!(".base-search-card__title"),
        parse_selector!(".job-card-list__title"),
        parse_selector!(".job-card-container__link"),
    ];

    static ref CARD_COMPANY: Vec<Selector> = vec![
        parse_selector!(".base-search-card__subtitle a"),
        parse_selector!(".job-card-container__company-name"),
        parse_selector!(".base-search-card__subtitle"),
        parse_selector!(".job-card-container__primary-description"),
        parse_selector!(".artdeco-entity-lockup__subtitle"),
    ];

    static ref CARD_LOCATION: Vec<Selector> = vec![
        parse_selector!(".job-search-card__location"),
        parse_selector!(".job-card-container__metadata-item"),
        parse_selector!(".artdeco-entity-lockup__caption"),
    ];

    // Listing detail page (authenticated top card, then guest top card)
    static ref DETAIL_TITLE: Vec<Selector> = vec![
        parse_selector!("h1.jobs-unified-top-card__job-title"),
        parse_selector!(".job-details-jobs-unified-top-card__job-title h1"),
        parse_selector!("h1.top-card-layout__title"),
        parse_selector!("h1.topcard__title"),
        parse_selector!("h2.top-card-layout__title"),
    ];

    static ref DETAIL_COMPANY: Vec<Selector> = vec![
        parse_selector!("a.jobs-unified-top-card__company-name"),
        parse_selector!(".jobs-unified-top-card__company-name"),
        parse_selector!(".job-details-jobs-unified-top-card__company-name a"),
        parse_selector!(".job-details-jobs-unified-top-card__company-name"),
        parse_selector!("a.topcard__org-name-link"),
        parse_selector!(".topcard__flavor a"),
    ];

    static ref DETAIL_LOCATION: Vec<Selector> = vec![
        parse_selector!(".jobs-unified-top-card__bullet"),
        parse_selector!(".job-details-jobs-unified-top-card__primary-description-container .tvm__text"),
        parse_selector!(".topcard__flavor--bullet"),
        parse_selector!(".top-card-layout__second-subline .topcard__flavor--bullet"),
    ];

    static ref LD_JSON: Selector = parse_selector!("script[type='application/ld+json']");
}

/// Selectors for search-result cards
pub struct CardSelectors {
    pub card: &'static [Selector],
    pub link: &'static [Selector],
    pub title: &'static [Selector],
    pub company: &'static [Selector],
    pub location: &'static [Selector],
}

impl CardSelectors {
    pub fn new() -> Self {
        Self {
            card: &CARD,
            link: &CARD_LINK,
            title: &CARD_TITLE,
            company: &CARD_COMPANY,
            location: &CARD_LOCATION,
        }
    }
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Selectors for a single listing's detail page
pub struct DetailSelectors {
    pub title: &'static [Selector],
    pub company: &'static [Selector],
    pub location: &'static [Selector],
}

impl DetailSelectors {
    pub fn new() -> Self {
        Self {
            title: &DETAIL_TITLE,
            company: &DETAIL_COMPANY,
            location: &DETAIL_LOCATION,
        }
    }
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Embedded structured-data blocks
pub fn ld_json() -> &'static Selector {
    &LD_JSON
}
