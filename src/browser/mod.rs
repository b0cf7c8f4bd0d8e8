//! Browser capability used by the harvester
//!
//! The engine only talks to a page through `BrowserPage`, which keeps it
//! independent of the automation backend. `ChromeSession` is the production
//! implementation over the Chrome DevTools Protocol.

mod chrome;

pub use chrome::ChromeSession;

use crate::BrowserResult;
use async_trait::async_trait;

/// Scrolls the window to the end of the document
pub const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Scrolls the window back to the top
pub const SCROLL_TO_TOP_JS: &str = "window.scrollTo(0, 0);";

/// Evaluates to `document.readyState`
pub const READY_STATE_JS: &str = "document.readyState";

/// Empties local and session storage of the current origin
pub const CLEAR_STORAGE_JS: &str =
    "(() => { try { localStorage.clear(); sessionStorage.clear(); } catch (e) {} return true; })()";

/// A single rendered page the harvester drives
///
/// Element handles are only valid until the DOM re-renders; operations on a
/// detached handle fail with `BrowserError::StaleElement`.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Handle to an element located with `find`
    type Element: Send + Sync;

    /// Loads `url` and waits for the navigation to commit
    async fn navigate(&self, url: &str) -> BrowserResult<()>;

    async fn current_url(&self) -> BrowserResult<String>;

    /// All elements matching a CSS selector, in document order
    async fn find(&self, selector: &str) -> BrowserResult<Vec<Self::Element>>;

    async fn outer_html(&self, element: &Self::Element) -> BrowserResult<String>;

    /// Rendered text of the element
    async fn text(&self, element: &Self::Element) -> BrowserResult<String>;

    /// Returns true if the element is displayed and not disabled
    async fn is_interactable(&self, element: &Self::Element) -> BrowserResult<bool>;

    async fn scroll_into_view(&self, element: &Self::Element) -> BrowserResult<()>;

    /// Programmatic (DOM) click, unaffected by overlays
    async fn click(&self, element: &Self::Element) -> BrowserResult<()>;

    /// Evaluates a script and returns its JSON result (`Null` for undefined)
    async fn execute_script(&self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Clears cookies and the current origin's web storage
    async fn delete_cookies(&self) -> BrowserResult<()>;

    /// Releases the page and its browser
    async fn close(&mut self) -> BrowserResult<()>;
}
