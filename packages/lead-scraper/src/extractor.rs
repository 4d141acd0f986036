//! Record extractor: rendered directory page → raw candidate records.
//!
//! Pure function of the page content, zero side effects. A page whose
//! markup does not match the expected listing structure yields an
//! empty vec; absence of matches is not an error at this stage.

use scraper::{Html, Selector};

use crate::types::{RawRecord, MISSING_PHONE, UNKNOWN_FIELD};

/// Listing container and sub-field selectors for the target
/// directory's result pages.
const LISTING_SELECTOR: &str = ".bi-bloc";
const NAME_SELECTOR: &str = ".bi-name";
const PHONE_SELECTOR: &str = ".bi-phone";
const ADDRESS_SELECTOR: &str = ".bi-address";

/// Extract every candidate record from a rendered page. Missing
/// sub-fields map to explicit placeholders so downstream stages
/// always see complete record shapes.
pub fn extract_records(html: &str, source_url: &str) -> Vec<RawRecord> {
    let document = Html::parse_document(html);

    // Selectors are compile-time constants; a parse failure would be
    // a bug in this module, not in the input page.
    let Ok(listing) = Selector::parse(LISTING_SELECTOR) else {
        return Vec::new();
    };
    let Ok(name) = Selector::parse(NAME_SELECTOR) else {
        return Vec::new();
    };
    let Ok(phone) = Selector::parse(PHONE_SELECTOR) else {
        return Vec::new();
    };
    let Ok(address) = Selector::parse(ADDRESS_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&listing)
        .map(|el| RawRecord {
            name: field_text(&el, &name).unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            phone: field_text(&el, &phone).unwrap_or_else(|| MISSING_PHONE.to_string()),
            address: field_text(&el, &address).unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            source_url: source_url.to_string(),
        })
        .collect()
}

fn field_text(element: &scraper::ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}
