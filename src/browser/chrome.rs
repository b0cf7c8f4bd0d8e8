use crate::browser::{BrowserPage, CLEAR_STORAGE_JS};
use crate::config::BrowserConfig;
use crate::{BrowserError, BrowserResult};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig as CdpConfig, Handler, Page};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Hides the automation flag most bot checks look at first
const MASK_WEBDRIVER_JS: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

const INTERACTABLE_JS: &str = "function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return !this.disabled && rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
}";

const SCROLL_INTO_VIEW_JS: &str = "function() { this.scrollIntoView({ block: 'center' }); }";

const CLICK_JS: &str = "function() { this.click(); }";

/// A Chromium instance with one working tab
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
    closed: Arc<AtomicBool>,
}

impl ChromeSession {
    /// Launches Chromium and opens a blank tab
    ///
    /// The binary comes from `chrome-path`, then the `CHROME_BIN` environment
    /// variable, then chromiumoxide's own detection.
    ///
    /// # Returns
    ///
    /// * `Ok(ChromeSession)` - Browser started and tab prepared
    /// * `Err(BrowserError::Launch)` - Browser could not be started
    pub async fn launch(config: &BrowserConfig) -> BrowserResult<Self> {
        let mut builder = CdpConfig::builder()
            .launch_timeout(Duration::from_secs(config.launch_timeout_secs))
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-geolocation")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", config.user_agent));

        if !config.headless {
            builder = builder.with_head();
        }

        let executable = config
            .chrome_path
            .clone()
            .or_else(|| std::env::var("CHROME_BIN").ok());
        if let Some(path) = executable {
            debug!("Using browser binary {}", path);
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder.build().map_err(BrowserError::Launch)?;
        let (browser, handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let closed = Arc::new(AtomicBool::new(false));
        let handler_task = spawn_handler_task(handler, Arc::clone(&closed));

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(MASK_WEBDRIVER_JS))
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        info!(
            "Browser launched ({})",
            if config.headless { "headless" } else { "visible" }
        );

        Ok(Self {
            browser,
            page,
            handler_task: Some(handler_task),
            closed,
        })
    }

    fn ensure_open(&self) -> BrowserResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserPage for ChromeSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.ensure_open()?;
        self.page.goto(url).await.map_err(map_cdp)?;
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        self.ensure_open()?;
        Ok(self.page.url().await.map_err(map_cdp)?.unwrap_or_default())
    }

    async fn find(&self, selector: &str) -> BrowserResult<Vec<Element>> {
        self.ensure_open()?;
        self.page.find_elements(selector).await.map_err(map_cdp)
    }

    async fn outer_html(&self, element: &Element) -> BrowserResult<String> {
        Ok(element.outer_html().await.map_err(map_cdp)?.unwrap_or_default())
    }

    async fn text(&self, element: &Element) -> BrowserResult<String> {
        Ok(element.inner_text().await.map_err(map_cdp)?.unwrap_or_default())
    }

    async fn is_interactable(&self, element: &Element) -> BrowserResult<bool> {
        let ret = element
            .call_js_fn(INTERACTABLE_JS, false)
            .await
            .map_err(map_cdp)?;
        Ok(ret.result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn scroll_into_view(&self, element: &Element) -> BrowserResult<()> {
        element
            .call_js_fn(SCROLL_INTO_VIEW_JS, false)
            .await
            .map_err(map_cdp)?;
        Ok(())
    }

    async fn click(&self, element: &Element) -> BrowserResult<()> {
        element.call_js_fn(CLICK_JS, false).await.map_err(map_cdp)?;
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> BrowserResult<serde_json::Value> {
        self.ensure_open()?;
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn delete_cookies(&self) -> BrowserResult<()> {
        self.ensure_open()?;
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(map_cdp)?;

        // about:blank has no storage to clear
        if let Err(e) = self.page.evaluate(CLEAR_STORAGE_JS).await {
            debug!("Web storage not cleared: {}", e);
        }
        Ok(())
    }

    async fn close(&mut self) -> BrowserResult<()> {
        let Some(handler_task) = self.handler_task.take() else {
            return Ok(());
        };

        if let Err(e) = self.browser.close().await {
            warn!("Browser did not close cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        handler_task.abort();
        let _ = handler_task.await;

        self.closed.store(true, Ordering::Release);
        info!("Browser closed");
        Ok(())
    }
}

fn spawn_handler_task(mut handler: Handler, closed: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("CDP handler event error: {}", e);
            }
        }
        closed.store(true, Ordering::Release);
    })
}

/// Classifies protocol errors, recognising detached DOM nodes
fn map_cdp(err: CdpError) -> BrowserError {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if lower.contains("no node")
        || lower.contains("could not find node")
        || lower.contains("detached")
    {
        BrowserError::StaleElement(message)
    } else if matches!(err, CdpError::Timeout) {
        BrowserError::Timeout(message)
    } else {
        BrowserError::Protocol(message)
    }
}
