//! Site profiles: where listings live on a page and how to read them
//!
//! A `SiteProfile` bundles everything that differs between directories:
//! the listing and control locators, the output column layout, and the
//! `FieldExtractor` strategy that turns one listing element into a `Record`.
//! The pagination engine itself is shared by every profile.

pub mod fields;
mod trustoo;
mod werkspot;

pub use trustoo::TrustooExtractor;
pub use werkspot::WerkspotExtractor;

use crate::storage::{keys, Record};
use std::fmt;
use std::sync::Arc;

/// Names accepted by `profile_by_name`
pub const PROFILE_NAMES: &[&str] = &["trustoo", "werkspot"];

/// Turns one rendered listing element into a record
///
/// Implementations never fail: a field that cannot be found degrades to
/// `FieldValue::Missing`.
pub trait FieldExtractor: Send + Sync + fmt::Debug {
    /// # Arguments
    ///
    /// * `html` - Outer HTML of the listing element
    /// * `page_url` - URL of the page, for resolving relative links
    fn extract(&self, html: &str, page_url: &str) -> Record;
}

/// One output column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Canonical record key
    pub key: &'static str,

    /// Header written to the output files
    pub header: &'static str,

    /// Cell text written for a missing value
    ///
    /// Reading a file back maps this text to missing, so a real value equal
    /// to the label (a review count of "0", an empty description) is loaded
    /// as missing. It is written out with the same text again, and neither
    /// column takes part in identity or noise checks.
    pub absent: &'static str,
}

impl Column {
    pub const fn new(key: &'static str, header: &'static str, absent: &'static str) -> Self {
        Self { key, header, absent }
    }
}

/// Columns filled in by enrichment, appended to every site layout
pub const ENRICHMENT_COLUMNS: [Column; 5] = [
    Column::new(keys::WEBSITE, "Website", ""),
    Column::new(keys::EMAIL, "Email", ""),
    Column::new(keys::CONTACT_PERSON, "Contactpersoon", ""),
    Column::new(keys::INDUSTRY_CODE, "SBI_Code", ""),
    Column::new(keys::ENRICHED, "AdHocData_Verrijkt", ""),
];

/// Finds listing elements on the page
#[derive(Debug, Clone)]
pub struct ListingLocator {
    /// Selector tried first
    pub primary: &'static str,

    /// Selectors tried in order when the primary one matches nothing
    pub fallbacks: &'static [&'static str],

    /// When set, a candidate is kept only if it contains a match
    pub must_contain: Option<&'static str>,
}

impl ListingLocator {
    /// Applies the `must_contain` filter to one candidate's outer HTML
    pub fn accepts(&self, html: &str) -> bool {
        match self.must_contain {
            None => true,
            Some(selector) => {
                let doc = fields::parse_listing(html);
                fields::select_first(doc.root_element(), selector).is_some()
            }
        }
    }
}

/// Finds a clickable control, by selector first and by visible text second
#[derive(Debug, Clone)]
pub struct ControlLocator {
    pub selector: &'static str,

    /// Elements whose text is compared against `texts`
    pub text_selector: &'static str,

    /// Any of these substrings identifies the control
    pub texts: &'static [&'static str],
}

impl ControlLocator {
    pub fn matches_text(&self, text: &str) -> bool {
        self.texts.iter().any(|t| text.contains(t))
    }
}

/// Everything the engine needs to know about one directory site
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub name: &'static str,
    pub listings: ListingLocator,
    pub load_more: ControlLocator,
    pub consent: ControlLocator,

    /// Path fragment the page URL must keep while harvesting
    pub required_path: Option<&'static str>,

    /// Output layout including the enrichment columns
    pub columns: Vec<Column>,

    pub extractor: Arc<dyn FieldExtractor>,
}

impl SiteProfile {
    /// The path fragment to guard for this target, if any
    ///
    /// The guard only applies when the target itself contains the fragment.
    pub fn guarded_path(&self, target_url: &str) -> Option<&'static str> {
        self.required_path.filter(|p| target_url.contains(p))
    }
}

/// Cookie banners on both sites use the same markup conventions
pub(crate) const CONSENT: ControlLocator = ControlLocator {
    selector: "[id*='cookie'] button, [class*='cookie'] button, [data-testid*='cookie'] button",
    text_selector: "button",
    texts: &["Accepteren", "Akkoord", "Accepteer"],
};

/// Builds the named profile for the given target URL
///
/// # Returns
///
/// * `Some(SiteProfile)` - `name` is one of `PROFILE_NAMES`
/// * `None` - Unknown profile name
pub fn profile_by_name(name: &str, target_url: &str) -> Option<SiteProfile> {
    match name {
        "trustoo" => Some(trustoo::profile(target_url)),
        "werkspot" => Some(werkspot::profile()),
        _ => None,
    }
}

fn with_enrichment(columns: &[Column]) -> Vec<Column> {
    columns.iter().chain(ENRICHMENT_COLUMNS.iter()).copied().collect()
}
