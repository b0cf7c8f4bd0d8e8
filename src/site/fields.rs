//! Helpers shared by the per-site field extractors
//!
//! Every helper returns `Option`/`Vec` instead of an error: a selector that
//! matches nothing, or does not parse, simply yields no value.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Longest description kept before truncation
pub const DESCRIPTION_LIMIT: usize = 200;

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[.,]\d+|\d+").expect("valid decimal regex"));
static PAREN_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("valid count regex"));
static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid integer regex"));

/// Parses one listing element's outer HTML
pub fn parse_listing(html: &str) -> Html {
    Html::parse_fragment(html)
}

/// The rendered text of an element with whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the element's own text nodes, ignoring descendants
pub fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .flat_map(|text| text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// All elements under `root` matching `selector`
pub fn select_all<'a>(root: ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(sel) => root.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

/// First element under `root` matching `selector`
pub fn select_first<'a>(root: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    root.select(&sel).next()
}

/// Text of the first match, or `None` when nothing matches
pub fn first_text(root: ElementRef<'_>, selector: &str) -> Option<String> {
    select_first(root, selector).map(element_text)
}

/// Non-empty texts of every match, in document order
pub fn all_texts(root: ElementRef<'_>, selector: &str) -> Vec<String> {
    select_all(root, selector)
        .into_iter()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// First rating-like number, with a decimal comma turned into a dot
pub fn first_decimal(text: &str) -> Option<String> {
    DECIMAL_RE
        .find(text)
        .map(|m| m.as_str().replace(',', "."))
}

/// The number between parentheses, e.g. "(128)" in "9,2 (128)"
pub fn parenthesized_count(text: &str) -> Option<String> {
    PAREN_COUNT_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn first_integer(text: &str) -> Option<String> {
    INTEGER_RE.find(text).map(|m| m.as_str().to_string())
}

/// Returns true for text containing a digit and at least 8 characters once
/// spaces and dashes are removed
pub fn looks_like_phone(text: &str) -> bool {
    let compact: String = text.chars().filter(|c| *c != ' ' && *c != '-').collect();
    text.chars().any(|c| c.is_ascii_digit()) && compact.chars().count() >= 8
}

/// Cuts the description at `DESCRIPTION_LIMIT` characters and appends "..."
pub fn truncate_description(text: &str) -> String {
    if text.chars().count() > DESCRIPTION_LIMIT {
        let cut: String = text.chars().take(DESCRIPTION_LIMIT).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Resolves a possibly relative href against the page URL
pub fn resolve_href(href: &str, page_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }

    Url::parse(page_url)
        .ok()
        .and_then(|base| base.join(href).ok())
        .map(|u| u.to_string())
}
