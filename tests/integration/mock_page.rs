//! Scripted stand-in for a rendered directory page
//!
//! The page reveals one batch of listings per successful "load more" click.
//! Clones share state, so a test keeps one handle and gives the other to the
//! harvester.

#![allow(dead_code)]

use async_trait::async_trait;
use listing_harvest::browser::{BrowserPage, READY_STATE_JS};
use listing_harvest::site::SiteProfile;
use listing_harvest::{BrowserError, BrowserResult, StopSignal};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockElement {
    Listing(usize),
    LoadMore,
    Consent,
}

#[derive(Debug, Default)]
struct State {
    batches: Vec<Vec<String>>,
    revealed: usize,
    url: String,
    endless: bool,
    consent_visible: bool,
    click_attempts: usize,
    failing_attempts: HashSet<usize>,
    fail_every_click: bool,
    successful_clicks: usize,
    stop_after: Option<(usize, StopSignal)>,
    script_calls: usize,
    failing_scripts: HashSet<usize>,
    listing_reads: usize,
    stop_on_read: Option<(usize, StopSignal)>,
    watched_file: Option<PathBuf>,
    file_seen_at_clicks: Vec<bool>,
    navigations: usize,
    closed: bool,
}

impl State {
    fn visible_listings(&self) -> Vec<&String> {
        self.batches.iter().take(self.revealed).flatten().collect()
    }

    fn has_more(&self) -> bool {
        self.endless || self.revealed < self.batches.len()
    }
}

#[derive(Debug, Clone)]
pub struct MockPage {
    state: Arc<Mutex<State>>,
    listing_selector: &'static str,
    load_more_selector: &'static str,
    consent_selector: &'static str,
}

impl MockPage {
    /// A page showing `batches[0]` after navigation and one more batch per click
    pub fn new(profile: &SiteProfile, batches: Vec<Vec<String>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                batches,
                consent_visible: true,
                ..State::default()
            })),
            listing_selector: profile.listings.primary,
            load_more_selector: profile.load_more.selector,
            consent_selector: profile.consent.selector,
        }
    }

    /// Keeps offering the control after the last batch
    pub fn endless(self) -> Self {
        self.state.lock().unwrap().endless = true;
        self
    }

    /// Click attempts (1-based) that fail with a stale element
    pub fn failing_attempts(self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.state.lock().unwrap().failing_attempts = attempts.into_iter().collect();
        self
    }

    pub fn fail_every_click(self) -> Self {
        self.state.lock().unwrap().fail_every_click = true;
        self
    }

    /// Trips `stop` during the given successful click
    pub fn stop_after(self, clicks: usize, stop: StopSignal) -> Self {
        self.state.lock().unwrap().stop_after = Some((clicks, stop));
        self
    }

    /// Page script calls (1-based, readiness polls excluded) that fail
    pub fn failing_scripts(self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.state.lock().unwrap().failing_scripts = calls.into_iter().collect();
        self
    }

    /// Trips `stop` while the given listing read (1-based, across all passes) is served
    pub fn stop_on_read(self, read: usize, stop: StopSignal) -> Self {
        self.state.lock().unwrap().stop_on_read = Some((read, stop));
        self
    }

    /// Records whether `path` exists at every load-more click
    pub fn watch_file(self, path: impl Into<PathBuf>) -> Self {
        self.state.lock().unwrap().watched_file = Some(path.into());
        self
    }

    pub fn file_seen_at_clicks(&self) -> Vec<bool> {
        self.state.lock().unwrap().file_seen_at_clicks.clone()
    }

    pub fn listing_reads(&self) -> usize {
        self.state.lock().unwrap().listing_reads
    }

    pub fn successful_clicks(&self) -> usize {
        self.state.lock().unwrap().successful_clicks
    }

    pub fn click_attempts(&self) -> usize {
        self.state.lock().unwrap().click_attempts
    }

    pub fn navigations(&self) -> usize {
        self.state.lock().unwrap().navigations
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn consent_visible(&self) -> bool {
        self.state.lock().unwrap().consent_visible
    }

    fn check_open(state: &State) -> BrowserResult<()> {
        if state.closed {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserPage for MockPage {
    type Element = MockElement;

    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        state.url = url.to_string();
        state.revealed = 1;
        state.navigations += 1;
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        let state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        Ok(state.url.clone())
    }

    async fn find(&self, selector: &str) -> BrowserResult<Vec<MockElement>> {
        let state = self.state.lock().unwrap();
        Self::check_open(&state)?;

        let found = if selector == self.listing_selector {
            (0..state.visible_listings().len())
                .map(MockElement::Listing)
                .collect()
        } else if selector == self.load_more_selector && state.has_more() {
            vec![MockElement::LoadMore]
        } else if selector == self.consent_selector && state.consent_visible {
            vec![MockElement::Consent]
        } else {
            Vec::new()
        };
        Ok(found)
    }

    async fn outer_html(&self, element: &MockElement) -> BrowserResult<String> {
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        match element {
            MockElement::Listing(i) => {
                state.listing_reads += 1;
                if let Some((read, stop)) = &state.stop_on_read {
                    if state.listing_reads == *read {
                        stop.trip();
                    }
                }
                state
                .visible_listings()
                .get(*i)
                .map(|html| html.to_string())
                    .ok_or_else(|| BrowserError::StaleElement(format!("listing {}", i)))
            }
            _ => Ok("<button></button>".to_string()),
        }
    }

    async fn text(&self, _element: &MockElement) -> BrowserResult<String> {
        Ok(String::new())
    }

    async fn is_interactable(&self, _element: &MockElement) -> BrowserResult<bool> {
        Ok(true)
    }

    async fn scroll_into_view(&self, _element: &MockElement) -> BrowserResult<()> {
        Ok(())
    }

    async fn click(&self, element: &MockElement) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;

        match element {
            MockElement::Consent => {
                state.consent_visible = false;
                Ok(())
            }
            MockElement::Listing(_) => Ok(()),
            MockElement::LoadMore => {
                state.click_attempts += 1;
                if let Some(path) = &state.watched_file {
                    let seen = path.exists();
                    state.file_seen_at_clicks.push(seen);
                }
                let attempt = state.click_attempts;
                if state.fail_every_click || state.failing_attempts.contains(&attempt) {
                    return Err(BrowserError::StaleElement("load more".to_string()));
                }

                state.successful_clicks += 1;
                if state.revealed < state.batches.len() {
                    state.revealed += 1;
                }
                if let Some((after, stop)) = &state.stop_after {
                    if state.successful_clicks == *after {
                        stop.trip();
                    }
                }
                Ok(())
            }
        }
    }

    async fn execute_script(&self, script: &str) -> BrowserResult<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        if script == READY_STATE_JS {
            return Ok(serde_json::Value::String("complete".to_string()));
        }

        state.script_calls += 1;
        if state.failing_scripts.contains(&state.script_calls) {
            return Err(BrowserError::Script("page script threw".to_string()));
        }
        Ok(serde_json::Value::Null)
    }

    async fn delete_cookies(&self) -> BrowserResult<()> {
        Ok(())
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// A Trustoo card with a name, an address and an optional profile link
pub fn card(name: &str, address: &str, url: Option<&str>) -> String {
    let link = url
        .map(|u| format!(r#"<a href="{}">profiel</a>"#, u))
        .unwrap_or_default();
    format!(
        r#"<div data-test-id="pro-list-item">
  <h3 class="proNameNew-module__5tvS2q__companyName">{}</h3>
  {}
  <div class="proBullets-module__JgvdTG__list"><div>{}</div></div>
</div>"#,
        name, link, address
    )
}

/// A card with neither name nor address
pub fn advert() -> String {
    r#"<div data-test-id="pro-list-item"><p>Gesponsord</p></div>"#.to_string()
}

/// `count` distinct cards whose names start with `prefix`
pub fn batch(prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            card(
                &format!("{} {}", prefix, i),
                &format!("Straat {}, Utrecht", i),
                Some(&format!(
                    "https://trustoo.nl/utrecht/elektricien/{}-{}/",
                    prefix.to_lowercase(),
                    i
                )),
            )
        })
        .collect()
}
