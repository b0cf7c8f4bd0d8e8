use crate::site::fields::{
    element_text, first_decimal, first_integer, first_text, looks_like_phone, own_text,
    parse_listing, resolve_href, select_all, select_first, truncate_description,
};
use crate::site::{
    with_enrichment, Column, ControlLocator, FieldExtractor, ListingLocator, SiteProfile, CONSENT,
};
use crate::storage::{keys, FieldValue, Record};
use std::sync::Arc;

const PROFILE_LINK: &str = "a[href*='/profiel/'], a[href*='/bedrijf/']";

const COLUMNS: &[Column] = &[
    Column::new(keys::NAME, "Naam", "Niet gevonden"),
    Column::new(keys::ADDRESS, "Adres", "Niet gevonden"),
    Column::new(keys::PHONE, "Telefoon", "Niet vermeld"),
    Column::new(keys::RATING, "Rating", "N/A"),
    Column::new(keys::REVIEW_COUNT, "AantalReviews", "0"),
    Column::new(keys::DESCRIPTION, "Beschrijving", ""),
    Column::new(keys::PROFILE_URL, "ProfielURL", ""),
];

pub(super) fn profile() -> SiteProfile {
    SiteProfile {
        name: "werkspot",
        listings: ListingLocator {
            primary: "[class*='card'], [class*='item'], [class*='result'], [class*='company']",
            fallbacks: &[PROFILE_LINK],
            must_contain: Some(PROFILE_LINK),
        },
        load_more: ControlLocator {
            selector: "button[data-test-id*='load'], button[class*='load-more'], button[class*='show-more']",
            text_selector: "button",
            texts: &["Meer", "Laad", "Toon"],
        },
        consent: CONSENT,
        required_path: None,
        columns: with_enrichment(COLUMNS),
        extractor: Arc::new(WerkspotExtractor),
    }
}

/// Field extractor for Werkspot result cards
///
/// Werkspot markup changes often, so every field is located through broad
/// class-substring selectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct WerkspotExtractor;

impl FieldExtractor for WerkspotExtractor {
    fn extract(&self, html: &str, page_url: &str) -> Record {
        let doc = parse_listing(html);
        let root = doc.root_element();

        let name = first_text(root, "h2, h3, .company-name, [class*='name']")
            .or_else(|| first_text(root, PROFILE_LINK));

        let address = first_text(root, "[class*='address'], [class*='location'], .address")
            .or_else(|| {
                select_all(root, "*")
                    .into_iter()
                    .filter(|el| own_text(*el).contains(','))
                    .map(element_text)
                    .find(|t| t.contains(',') && t.chars().count() > 5)
            });

        let phone = select_all(root, "[class*='phone'], [class*='tel'], a[href^='tel:']")
            .into_iter()
            .map(|el| {
                let text = element_text(el);
                if text.is_empty() {
                    el.value()
                        .attr("href")
                        .map(|h| h.trim_start_matches("tel:").to_string())
                        .unwrap_or_default()
                } else {
                    text
                }
            })
            .find(|t| looks_like_phone(t));

        let rating = select_all(root, "[class*='rating'], [class*='score'], [class*='star']")
            .into_iter()
            .find_map(|el| first_decimal(&element_text(el)));

        let reviews = select_all(root, "[class*='review']")
            .into_iter()
            .find_map(|el| first_integer(&element_text(el)));

        let profile_url = select_all(root, PROFILE_LINK)
            .into_iter()
            .filter_map(|a| a.value().attr("href"))
            .find(|href| href.contains("/profiel/") || href.contains("/bedrijf/"))
            .and_then(|href| resolve_href(href, page_url));

        let description = select_first(root, "[class*='description'], [class*='bio'], p")
            .map(|el| truncate_description(&element_text(el)));

        Record::new()
            .with(keys::NAME, FieldValue::from_option(name))
            .with(keys::ADDRESS, FieldValue::from_option(address))
            .with(keys::PHONE, FieldValue::from_option(phone))
            .with(keys::RATING, FieldValue::from_option(rating))
            .with(keys::REVIEW_COUNT, FieldValue::from_option(reviews))
            .with(keys::PROFILE_URL, FieldValue::from_option(profile_url))
            .with(keys::DESCRIPTION, FieldValue::from_option(description))
    }
}
