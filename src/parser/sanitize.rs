//! Text cleanup for extracted listing fields
//!
//! Rendered pages duplicate text for screen readers, append badge labels to
//! titles and spell the same city several ways. The functions here turn that
//! into stable values. Both normalizers iterate to a fixed point, so applying
//! them twice is the same as applying them once.

use regex::Regex;
use std::sync::LazyLock;

use crate::utils::normalize_whitespace;

// Badge text rendered next to verified listings
static NOISE_PHRASE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwith verification\b").unwrap());

/// Canonical city spellings and their lowercase variants
const CITY_VARIANTS: &[(&str, &[&str])] = &[
    (
        "Tel Aviv",
        &[
            "tel aviv",
            "tel-aviv",
            "tel aviv-yafo",
            "tel aviv yafo",
            "tel aviv-jaffa",
            "tel aviv district",
            "tlv",
        ],
    ),
    (
        "Herzliya",
        &["herzliya", "herzliyya", "herzelia", "herzliya pituah"],
    ),
    ("Ra'anana", &["ra'anana", "raanana", "ra\u{2019}anana", "ra'anana district"]),
    (
        "Be'er Sheva",
        &["be'er sheva", "beer sheva", "beer-sheva", "beersheba", "be\u{2019}er sheva"],
    ),
    (
        "Petah Tikva",
        &["petah tikva", "petach tikva", "petah tiqva", "petah tikwa", "petach tikwa"],
    ),
    ("Jerusalem", &["jerusalem", "jerusalem district"]),
    ("Haifa", &["haifa", "haifa district"]),
    ("Ramat Gan", &["ramat gan", "ramat-gan"]),
    ("Netanya", &["netanya", "natanya"]),
    ("Rehovot", &["rehovot", "rehovoth"]),
    ("Hod HaSharon", &["hod hasharon", "hod ha-sharon", "hod ha'sharon"]),
];

const COUNTRY: &str = "Israel";
const COUNTRY_VARIANTS: &[&str] = &["israel"];
// Country codes only count next to a known city; "IL" alone is also a US state
const COUNTRY_CODES: &[&str] = &["il", "isr"];

/// Clean a raw field value, rejecting values that carry no information
///
/// Returns `None` for empty strings and the literal `none` placeholder some
/// pages render for a missing organization.
pub fn clean_value(raw: &str) -> Option<String> {
    let cleaned = normalize_whitespace(&remove_zero_width(raw));
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(cleaned)
    }
}

/// Remove zero-width spaces and similar invisible characters
pub fn remove_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c, '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}'))
        .collect()
}

/// Normalize a listing title
///
/// # Examples
///
/// ```
/// use jobtrail::parser::sanitize::normalize_title;
///
/// assert_eq!(
///     normalize_title("Junior Data Analyst Junior Data Analyst"),
///     "Junior Data Analyst"
/// );
/// assert_eq!(normalize_title("Data Scientist with verification"), "Data Scientist");
/// ```
pub fn normalize_title(raw: &str) -> String {
    let mut current = normalize_whitespace(raw);
    loop {
        let next = normalize_title_step(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn normalize_title_step(title: &str) -> String {
    let without_noise = NOISE_PHRASE_REGEX.replace_all(title, " ");
    let mut tokens: Vec<&str> = without_noise.split_whitespace().collect();

    collapse_leading_repeat(&mut tokens);
    tokens.dedup_by(|a, b| a.to_lowercase() == b.to_lowercase());

    tokens.join(" ")
}

/// Collapse `X Y X Y Z` into `X Y Z`, trying the longest repetition first
fn collapse_leading_repeat(tokens: &mut Vec<&str>) {
    'outer: loop {
        for k in (1..=tokens.len() / 2).rev() {
            let repeated = tokens[..k]
                .iter()
                .zip(&tokens[k..2 * k])
                .all(|(a, b)| a.to_lowercase() == b.to_lowercase());
            if repeated {
                tokens.drain(k..2 * k);
                continue 'outer;
            }
        }
        return;
    }
}

/// Normalize a location string
///
/// # Examples
///
/// ```
/// use jobtrail::parser::sanitize::normalize_location;
///
/// assert_eq!(normalize_location("tel aviv"), "Tel Aviv, Israel");
/// assert_eq!(normalize_location("Tel Aviv, Israel, Israel"), "Tel Aviv, Israel");
/// ```
pub fn normalize_location(raw: &str) -> String {
    let raw_parts: Vec<String> = raw
        .split(',')
        .map(|part| normalize_whitespace(&remove_zero_width(part)))
        .filter(|part| !part.is_empty())
        .collect();
    let has_city = raw_parts
        .iter()
        .any(|part| canonical_city(&part.to_lowercase()).is_some());

    let mut parts: Vec<String> = Vec::new();
    let mut has_country = false;

    for part in raw_parts {
        let key = part.to_lowercase();
        let is_country = COUNTRY_VARIANTS.contains(&key.as_str())
            || (has_city && COUNTRY_CODES.contains(&key.as_str()));
        let canonical = if let Some(city) = canonical_city(&key) {
            city.to_string()
        } else if is_country {
            has_country = true;
            COUNTRY.to_string()
        } else {
            part
        };

        let lowered = canonical.to_lowercase();
        if !parts.iter().any(|p| p.to_lowercase() == lowered) {
            parts.push(canonical);
        }
    }

    if has_city && !has_country {
        parts.push(COUNTRY.to_string());
    }

    parts.join(", ")
}

fn canonical_city(key: &str) -> Option<&'static str> {
    CITY_VARIANTS
        .iter()
        .find(|(_, variants)| variants.contains(&key))
        .map(|(city, _)| *city)
}
