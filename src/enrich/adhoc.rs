//! Ad Hoc Data business-register client
//!
//! Looks a listing up by name and address, accepts a candidate only when both
//! match, and merges contact details into the record.

use super::{
    Enricher, STATUS_LOOKUP_FAILED, STATUS_MISSING_ADDRESS, STATUS_MISSING_NAME, STATUS_NO_MATCH,
    STATUS_YES,
};
use crate::config::EnrichmentConfig;
use crate::storage::{keys, Record};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Environment variable holding the API key when the config has none
pub const API_KEY_ENV: &str = "AD_HOC_DATA_API_KEY";

/// Lookup endpoints, tried in order until one exists
const ENDPOINTS: [&str; 4] = ["lookup", "search", "companies", "bedrijven"];

const NAME_FIELDS: &[&str] = &["naam", "Naam", "name"];
const ADDRESS_FIELDS: &[&str] = &["adres", "Adres", "address"];
const WEBSITE_FIELDS: &[&str] = &["website", "Website", "url"];
const PHONE_FIELDS: &[&str] = &["telefoon", "Telefoon", "phone"];
const EMAIL_FIELDS: &[&str] = &["email", "Email", "e_mail"];
const CONTACT_FIELDS: &[&str] = &["contactpersoon", "Contactpersoon", "contact"];
const SBI_FIELDS: &[&str] = &["sbi", "SBI", "sbi_code"];

/// HTTP client for the Ad Hoc Data API
#[derive(Debug, Clone)]
pub struct AdHocDataClient {
    client: Client,
    base_url: String,
}

impl AdHocDataClient {
    /// Builds a client that authenticates with `api_key`
    ///
    /// The key is sent both as a bearer token and as `X-API-Key`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| HarvestError::Enrichment(format!("invalid API key: {}", e)))?;
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| HarvestError::Enrichment(format!("invalid API key: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("x-api-key", key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds a client from configuration, falling back to `AD_HOC_DATA_API_KEY`
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                HarvestError::Enrichment(format!(
                    "no API key configured and {} is not set",
                    API_KEY_ENV
                ))
            })?;

        Self::new(&config.base_url, &api_key)
    }

    /// Queries the endpoints in order
    ///
    /// A 404 moves on to the next endpoint. Any other failure, or a body that
    /// is not JSON, ends the lookup without a result.
    pub async fn lookup(&self, name: &str, address: &str) -> Option<Value> {
        let params = [("q", name), ("address", address), ("adres", address)];

        for endpoint in ENDPOINTS {
            let url = format!("{}/nl-basis/1.0/{}", self.base_url, endpoint);

            let response = match self.client.get(&url).query(&params).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Lookup request for '{}' failed: {}", name, e);
                    return None;
                }
            };

            match response.status() {
                StatusCode::NOT_FOUND => continue,
                status if status.is_success() => {
                    return match response.json::<Value>().await {
                        Ok(body) => Some(body),
                        Err(e) => {
                            tracing::warn!("Unreadable lookup response from {}: {}", url, e);
                            None
                        }
                    };
                }
                status => {
                    tracing::warn!("Lookup for '{}' rejected with {}", name, status);
                    return None;
                }
            }
        }

        tracing::warn!("No lookup endpoint available under {}", self.base_url);
        None
    }
}

#[async_trait]
impl Enricher for AdHocDataClient {
    async fn enrich(&self, record: &Record) -> Record {
        let mut enriched = record.clone();

        let Some(name) = record.name().filter(|n| !n.trim().is_empty()) else {
            enriched.set(keys::ENRICHED, STATUS_MISSING_NAME);
            return enriched;
        };
        let Some(address) = record.address().filter(|a| !a.trim().is_empty()) else {
            enriched.set(keys::ENRICHED, STATUS_MISSING_ADDRESS);
            return enriched;
        };

        let Some(body) = self.lookup(name, address).await else {
            enriched.set(keys::ENRICHED, STATUS_LOOKUP_FAILED);
            return enriched;
        };

        match best_match(&body, name, address) {
            Some(candidate) => {
                merge(&mut enriched, candidate);
                tracing::debug!("Enriched '{}'", name);
            }
            None => enriched.set(keys::ENRICHED, STATUS_NO_MATCH),
        }

        enriched
    }
}

/// Candidate objects in a response body
///
/// `data` and `result` may hold one object or a list; `results` holds a list;
/// otherwise the body itself is the candidate.
fn candidates(body: &Value) -> Vec<&Value> {
    let inner = ["data", "result", "results"]
        .iter()
        .find_map(|key| body.get(key))
        .unwrap_or(body);

    match inner {
        Value::Array(items) => items.iter().filter(|v| v.is_object()).collect(),
        Value::Object(_) => vec![inner],
        _ => Vec::new(),
    }
}

/// First candidate whose name and address both match the listing
fn best_match<'a>(body: &'a Value, name: &str, address: &str) -> Option<&'a Value> {
    candidates(body).into_iter().find(|candidate| {
        let candidate_name = field(candidate, NAME_FIELDS);
        let candidate_address = field(candidate, ADDRESS_FIELDS);
        match (candidate_name, candidate_address) {
            (Some(n), Some(a)) => names_match(name, &n) && addresses_match(address, &a),
            _ => false,
        }
    })
}

/// Either name contains the other, ignoring case
fn names_match(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

/// Some comma-separated part longer than three characters of either address
/// occurs in the other
fn addresses_match(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    part_occurs_in(&a, &b) || part_occurs_in(&b, &a)
}

fn part_occurs_in(parts_of: &str, other: &str) -> bool {
    parts_of
        .split(',')
        .map(str::trim)
        .filter(|part| part.chars().count() > 3)
        .any(|part| other.contains(part))
}

/// First non-empty value among the field aliases, numbers included
fn field(candidate: &Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match candidate.get(alias)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn merge(record: &mut Record, candidate: &Value) {
    if let Some(website) = field(candidate, WEBSITE_FIELDS) {
        record.set(keys::WEBSITE, website);
    }

    let has_phone = record
        .value(keys::PHONE)
        .is_some_and(|p| !p.trim().is_empty());
    if !has_phone {
        if let Some(phone) = field(candidate, PHONE_FIELDS) {
            record.set(keys::PHONE, phone);
        }
    }

    record.set(keys::EMAIL, field(candidate, EMAIL_FIELDS).unwrap_or_default());
    record.set(
        keys::CONTACT_PERSON,
        field(candidate, CONTACT_FIELDS).unwrap_or_default(),
    );
    record.set(
        keys::INDUSTRY_CODE,
        field(candidate, SBI_FIELDS).unwrap_or_default(),
    );
    record.set(keys::ENRICHED, STATUS_YES);
}
