use crate::site::fields::{
    all_texts, element_text, first_text, looks_like_phone, own_text, parenthesized_count,
    parse_listing, resolve_href, select_all, select_first, truncate_description,
};
use crate::site::{
    with_enrichment, Column, ControlLocator, FieldExtractor, ListingLocator, SiteProfile, CONSENT,
};
use crate::storage::{keys, FieldValue, Record};
use std::sync::Arc;

const NAME: &str = "h3.proNameNew-module__5tvS2q__companyName";
const BULLET_DIVS: &str = "div[class*='proBullets-module__JgvdTG__list'] div";
const PHONE: &str = "div[class*='proBullets-module__JgvdTG__list'] div[class*='underline']";
const SCORE: &str = "div.score-module__7oD7Ya__stars b";
const REVIEWS: &str = "div.score-module__7oD7Ya__stars small span:not(.hidden)";
const LABELS: &str = "div.profileLabels-module__6DVY6G__profileLabel span";
const LAST_REVIEW: &str = "span.proBullets-module__JgvdTG__lastReviewDate";
const DESCRIPTION: &str = "div[style*='-webkit-line-clamp:2'] p";

/// Material icon names rendered as text inside the profile labels
const ICON_WORDS: &[&str] = &["local_offer", "flash_on", "grade"];

const COLUMNS: &[Column] = &[
    Column::new(keys::NAME, "Naam", "Niet gevonden"),
    Column::new(keys::ADDRESS, "Adres", "Niet gevonden"),
    Column::new(keys::PHONE, "Telefoon", "Niet vermeld"),
    Column::new(keys::RATING, "TrustScore", "N/A"),
    Column::new(keys::REVIEW_COUNT, "AantalReviews", "0"),
    Column::new(keys::AVAILABILITY, "Beschikbaarheid", "Niet vermeld"),
    Column::new(keys::YEARS_IN_BUSINESS, "JarenInBedrijf", ""),
    Column::new(keys::LAST_REVIEW, "LaatsteReview", ""),
    Column::new(keys::DESCRIPTION, "Beschrijving", ""),
    Column::new(keys::PROFILE_URL, "ProfielURL", ""),
];

pub(super) fn profile(target_url: &str) -> SiteProfile {
    SiteProfile {
        name: "trustoo",
        listings: ListingLocator {
            primary: "div[data-test-id='pro-list-item']",
            fallbacks: &["[data-test-id*='pro-list']", "article"],
            must_contain: None,
        },
        load_more: ControlLocator {
            selector: "button.button-module__4-hbqa__btnReset.button-module__4-hbqa__text.button-module__4-hbqa__larger",
            text_selector: "button",
            texts: &["Toon meer resultaten", "Meer resultaten", "Laad meer"],
        },
        consent: CONSENT,
        required_path: Some("/nederland/"),
        columns: with_enrichment(COLUMNS),
        extractor: Arc::new(TrustooExtractor::for_target(target_url)),
    }
}

/// Field extractor for Trustoo "pro list" cards
///
/// Profile links are recognised by the category segment of the target URL
/// (`/elektricien/` for `https://trustoo.nl/nederland/elektricien/`).
#[derive(Debug, Clone)]
pub struct TrustooExtractor {
    category: String,
}

impl TrustooExtractor {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }

    /// Uses the last path segment of the target URL as category
    pub fn for_target(target_url: &str) -> Self {
        let category = url::Url::parse(target_url)
            .ok()
            .and_then(|u| {
                u.path_segments()?
                    .filter(|s| !s.is_empty())
                    .last()
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "elektricien".to_string());
        Self::new(category)
    }
}

impl FieldExtractor for TrustooExtractor {
    fn extract(&self, html: &str, page_url: &str) -> Record {
        let doc = parse_listing(html);
        let root = doc.root_element();
        let bullets = select_all(root, BULLET_DIVS);

        let address = bullets
            .iter()
            .find(|div| own_text(**div).contains(','))
            .map(|div| element_text(*div));

        let phone = all_texts(root, PHONE)
            .into_iter()
            .find(|t| looks_like_phone(t));

        let reviews = first_text(root, REVIEWS).and_then(|t| parenthesized_count(&t));

        let labels: Vec<String> = all_texts(root, LABELS)
            .into_iter()
            .filter(|t| !ICON_WORDS.contains(&t.as_str()))
            .collect();
        let availability = (!labels.is_empty()).then(|| labels.join(", "));

        let link = format!("a[href*='/{}/']", self.category);
        let profile_url = select_first(root, &link)
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_href(href, page_url));

        let years = bullets
            .iter()
            .find(|div| own_text(**div).contains("jaar in bedrijf"))
            .map(|div| element_text(*div));

        let description = first_text(root, DESCRIPTION).map(|d| truncate_description(&d));

        Record::new()
            .with(keys::NAME, FieldValue::from_option(first_text(root, NAME)))
            .with(keys::ADDRESS, FieldValue::from_option(address))
            .with(keys::PHONE, FieldValue::from_option(phone))
            .with(keys::RATING, FieldValue::from_option(first_text(root, SCORE)))
            .with(keys::REVIEW_COUNT, FieldValue::from_option(reviews))
            .with(keys::AVAILABILITY, FieldValue::from_option(availability))
            .with(keys::PROFILE_URL, FieldValue::from_option(profile_url))
            .with(keys::YEARS_IN_BUSINESS, FieldValue::from_option(years))
            .with(keys::LAST_REVIEW, FieldValue::from_option(first_text(root, LAST_REVIEW)))
            .with(keys::DESCRIPTION, FieldValue::from_option(description))
    }
}
