//! Listing records and their identity keys

use std::collections::BTreeMap;
use std::fmt;

/// Canonical field keys shared by extractors, layouts and enrichment
pub mod keys {
    pub const NAME: &str = "name";
    pub const ADDRESS: &str = "address";
    pub const PHONE: &str = "phone";
    pub const RATING: &str = "rating";
    pub const REVIEW_COUNT: &str = "review_count";
    pub const AVAILABILITY: &str = "availability";
    pub const YEARS_IN_BUSINESS: &str = "years_in_business";
    pub const LAST_REVIEW: &str = "last_review";
    pub const DESCRIPTION: &str = "description";
    pub const PROFILE_URL: &str = "profile_url";
    pub const WEBSITE: &str = "website";
    pub const EMAIL: &str = "email";
    pub const CONTACT_PERSON: &str = "contact_person";
    pub const INDUSTRY_CODE: &str = "industry_code";
    pub const ENRICHED: &str = "enriched";
}

/// A single field of a record
///
/// `Missing` means the page did not expose the field at all, which is not the
/// same as a field that was present but empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FieldValue {
    #[default]
    Missing,
    Value(String),
}

impl FieldValue {
    /// Builds a value from extracted text, treating `None` as missing
    pub fn from_option(value: Option<String>) -> Self {
        value.map(Self::Value).unwrap_or(Self::Missing)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Missing => None,
            Self::Value(s) => Some(s),
        }
    }

    /// The value, or `absent` when the field is missing
    pub fn or_label<'a>(&'a self, absent: &'a str) -> &'a str {
        self.as_str().unwrap_or(absent)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

/// The value(s) deciding whether two records denote the same listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// The listing's profile URL, when one was found
    Url(String),

    /// Fallback for listings without a profile URL
    NameAddress(Option<String>, Option<String>),
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::NameAddress(name, address) => write!(
                f,
                "{} / {}",
                name.as_deref().unwrap_or("-"),
                address.as_deref().unwrap_or("-")
            ),
        }
    }
}

/// One business listing as a mapping of canonical keys to values
///
/// Keys that were never set read as `FieldValue::Missing`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

static MISSING: FieldValue = FieldValue::Missing;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> &FieldValue {
        self.fields.get(key).unwrap_or(&MISSING)
    }

    /// The field's text, or `None` when missing
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).as_str()
    }

    /// Returns true if the field was set to anything, including `Missing`
    pub fn has_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.value(keys::NAME)
    }

    pub fn address(&self) -> Option<&str> {
        self.value(keys::ADDRESS)
    }

    /// Non-empty profile URL, if any
    pub fn profile_url(&self) -> Option<&str> {
        self.value(keys::PROFILE_URL).filter(|u| !u.trim().is_empty())
    }

    /// Extraction noise: neither a name nor an address was found
    pub fn is_noise(&self) -> bool {
        self.get(keys::NAME).is_missing() && self.get(keys::ADDRESS).is_missing()
    }

    /// The key used for the duplicate check
    ///
    /// The profile URL wins when present; otherwise the (name, address) pair.
    pub fn identity_key(&self) -> IdentityKey {
        match self.profile_url() {
            Some(url) => IdentityKey::Url(url.to_string()),
            None => self.name_address_key(),
        }
    }

    /// The (name, address) pair, regardless of whether a URL exists
    pub fn name_address_key(&self) -> IdentityKey {
        IdentityKey::NameAddress(
            self.name().map(str::to_string),
            self.address().map(str::to_string),
        )
    }

    /// Field keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
