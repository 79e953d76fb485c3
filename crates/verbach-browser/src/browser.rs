//! Browser lifecycle management using Chrome DevTools Protocol
//!
//! `headless_chrome` is synchronous; every CDP call is moved onto tokio's
//! blocking pool so the result watches can run side by side.

use crate::page::{PageDriver, PdfOptions, SessionLauncher};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::{CaptureScreenshotFormatOption, Viewport};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use verbach_core::config::{BrowserSettings, VerbachConfig};
use verbach_core::{Result, VerbachError};

/// Extra idle allowance on top of the longest wait, so Chrome is not
/// considered dead while we are still legitimately waiting on it
const IDLE_MARGIN: Duration = Duration::from_secs(30);

/// Launches one headless Chrome per lookup
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    settings: BrowserSettings,
    idle_timeout: Duration,
    poll_interval: Duration,
}

impl ChromeLauncher {
    pub fn new(config: &VerbachConfig) -> Self {
        let timings = &config.timings;
        let longest_wait = timings.navigation_timeout().max(timings.result_timeout());
        Self {
            settings: config.browser.clone(),
            idle_timeout: longest_wait + IDLE_MARGIN,
            poll_interval: timings.poll_interval(),
        }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>> {
        let session =
            BrowserSession::launch(self.settings.clone(), self.idle_timeout, self.poll_interval)
                .await?;
        Ok(Box::new(session))
    }
}

/// Active browser session with Chrome DevTools Protocol
pub struct BrowserSession {
    /// Underlying browser process, dropped (and killed) on close
    browser: Mutex<Option<Browser>>,
    /// The single tab the lookup runs in
    tab: Arc<Tab>,
    slow_mo: Option<Duration>,
    poll_interval: Duration,
}

impl BrowserSession {
    /// Launch a new browser instance with one blank tab
    pub async fn launch(
        settings: BrowserSettings,
        idle_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            settings.headless(),
            settings.window_width,
            settings.window_height
        );

        let slow_mo = settings.slow_mo();
        let (browser, tab) = tokio::task::spawn_blocking(move || {
            let launch_options = LaunchOptions::default_builder()
                .headless(settings.headless())
                .sandbox(false)
                .window_size(Some((settings.window_width, settings.window_height)))
                .path(settings.chrome_path.clone())
                .idle_browser_timeout(idle_timeout)
                .args(vec![
                    OsStr::new("--disable-setuid-sandbox"),
                    OsStr::new("--disable-dev-shm-usage"),
                    OsStr::new("--disable-gpu"),
                ])
                .build()
                .map_err(|e| VerbachError::Browser(format!("Invalid launch options: {}", e)))?;

            let browser = Browser::new(launch_options)
                .map_err(|e| VerbachError::Browser(format!("Failed to launch browser: {}", e)))?;

            let tab = browser
                .new_tab()
                .map_err(|e| VerbachError::Browser(format!("Failed to create tab: {}", e)))?;

            tab.set_user_agent(&settings.user_agent, None, None)
                .map_err(|e| VerbachError::Browser(format!("Failed to set user agent: {}", e)))?;

            Ok::<_, VerbachError>((browser, tab))
        })
        .await
        .map_err(|e| VerbachError::Browser(format!("Browser launch task failed: {}", e)))??;

        info!("Browser launched successfully");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            tab,
            slow_mo,
            poll_interval,
        })
    }

    /// Run a blocking CDP call against the tab
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(tab.as_ref()))
            .await
            .map_err(|e| VerbachError::Browser(format!("CDP task failed: {}", e)))?
    }

    /// Debug-mode pause before an interactive step
    async fn pace(&self) {
        if let Some(delay) = self.slow_mo {
            tokio::time::sleep(delay).await;
        }
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) {{ return false; }}
                const style = window.getComputedStyle(el);
                if (style.display === 'none' || style.visibility === 'hidden') {{ return false; }}
                return !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
            }})()"#,
            js_string(selector)
        );
        Ok(self.evaluate(&script).await?.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        debug!("Navigating to {}", url);

        let target = url.to_string();
        let navigation = self.blocking(move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&target)
                .map_err(|e| VerbachError::Navigation(format!("{}: {}", target, e)))?;
            tab.wait_until_navigated()
                .map_err(|e| VerbachError::Navigation(format!("{}: {}", target, e)))?;
            Ok(())
        });

        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| VerbachError::Timeout {
                what: format!("navigation to {}", url),
                timeout_ms: timeout.as_millis() as u64,
            })??;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()> {
        debug!("Waiting for element: {} (timeout: {:?})", selector, timeout);

        let selector_owned = selector.to_string();
        self.blocking(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector_owned, timeout)
                .map(|_| ())
                .map_err(|_| VerbachError::Timeout {
                    what: selector_owned.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                })
        })
        .await?;

        debug!("Element found: {}", selector);
        Ok(())
    }

    async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        poll_until(selector, timeout, self.poll_interval, move || {
            self.is_visible(selector)
        })
        .await?;
        debug!("Element visible: {}", selector);
        Ok(())
    }

    async fn replace_text(&self, selector: &str, text: &str) -> Result<()> {
        self.pace().await;

        let selector_owned = selector.to_string();
        let text_owned = text.to_string();
        self.blocking(move |tab| {
            let element = tab
                .find_element(&selector_owned)
                .map_err(|_| VerbachError::ElementNotFound {
                    selector: selector_owned.clone(),
                })?;
            element
                .click()
                .map_err(|e| VerbachError::Browser(format!("Click on {} failed: {}", selector_owned, e)))?;
            element
                .call_js_fn("function() { this.select(); }", vec![], false)
                .map_err(|e| VerbachError::Browser(format!("Select on {} failed: {}", selector_owned, e)))?;
            tab.type_str(&text_owned)
                .map_err(|e| VerbachError::Browser(format!("Typing into {} failed: {}", selector_owned, e)))?;
            Ok(())
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.pace().await;

        let selector_owned = selector.to_string();
        self.blocking(move |tab| {
            let element = tab
                .find_element(&selector_owned)
                .map_err(|_| VerbachError::ElementNotFound {
                    selector: selector_owned.clone(),
                })?;
            element
                .click()
                .map_err(|e| VerbachError::Browser(format!("Click on {} failed: {}", selector_owned, e)))?;
            Ok(())
        })
        .await
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.pace().await;

        let key_owned = key.to_string();
        self.blocking(move |tab| {
            tab.press_key(&key_owned)
                .map_err(|e| VerbachError::Browser(format!("Key press {} failed: {}", key_owned, e)))?;
            Ok(())
        })
        .await
    }

    async fn inner_text(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.innerText : null; }})()",
            js_string(selector)
        );
        let value = self.evaluate(&script).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn body_text(&self) -> Result<String> {
        let value = self
            .evaluate("document.body ? document.body.innerText : ''")
            .await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let script_owned = script.to_string();
        self.blocking(move |tab| {
            let result = tab
                .evaluate(&script_owned, false)
                .map_err(|e| VerbachError::Browser(format!("JavaScript evaluation failed: {}", e)))?;
            Ok(result.value.unwrap_or(serde_json::Value::Null))
        })
        .await
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let clip = match self.evaluate(PAGE_EXTENT_SCRIPT).await {
            Ok(extent) => full_page_clip(&extent),
            Err(e) => {
                debug!("Page size unavailable, capturing viewport only: {}", e);
                None
            }
        };

        self.blocking(move |tab| {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, clip, true)
                .map_err(|e| VerbachError::Browser(format!("CDP capture failed: {}", e)))
        })
        .await
    }

    async fn print_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>> {
        let print_options = PrintToPdfOptions {
            landscape: Some(options.landscape),
            print_background: Some(options.print_background),
            scale: Some(options.scale),
            paper_width: Some(options.paper_width_in),
            paper_height: Some(options.paper_height_in),
            margin_top: Some(options.margin_in),
            margin_bottom: Some(options.margin_in),
            margin_left: Some(options.margin_in),
            margin_right: Some(options.margin_in),
            ..Default::default()
        };

        self.blocking(move |tab| {
            tab.print_to_pdf(Some(print_options))
                .map_err(|e| VerbachError::Rendering(e.to_string()))
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        info!("Closing browser session");

        let browser = self
            .browser
            .lock()
            .map_err(|_| VerbachError::Browser("Browser handle lock poisoned".to_string()))?
            .take();

        let Some(browser) = browser else {
            debug!("Browser session already closed");
            return Ok(());
        };

        self.blocking(move |tab| {
            let closed = tab
                .close(true)
                .map_err(|e| VerbachError::Browser(format!("Failed to close tab: {}", e)));
            // Dropping the handle kills the Chrome process
            drop(browser);
            closed.map(|_| ())
        })
        .await
    }
}

/// Scrollable size of the document, in CSS pixels
const PAGE_EXTENT_SCRIPT: &str = r#"(() => {
    const root = document.documentElement;
    const body = document.body || root;
    return {
        width: Math.max(root.scrollWidth, body.scrollWidth, root.clientWidth),
        height: Math.max(root.scrollHeight, body.scrollHeight, root.clientHeight)
    };
})()"#;

/// Clip covering the whole document, `None` if the size is unusable
fn full_page_clip(extent: &serde_json::Value) -> Option<Viewport> {
    let width = extent.get("width")?.as_f64()?;
    let height = extent.get("height")?.as_f64()?;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    Some(Viewport {
        x: 0.0,
        y: 0.0,
        width,
        height,
        scale: 1.0,
    })
}

/// Poll `check` until it reports true or `timeout` runs out
///
/// Each check only gets the time left before the deadline, so a stalled CDP
/// call cannot hold the wait past `timeout`. Check errors are treated as
/// "not yet" since the page may be mid-update.
pub(crate) async fn poll_until<F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let started = Instant::now();
    let timed_out = || VerbachError::Timeout {
        what: format!("{} to become visible", what),
        timeout_ms: timeout.as_millis() as u64,
    };

    loop {
        let remaining = timeout.saturating_sub(started.elapsed());
        match tokio::time::timeout(remaining, check()).await {
            Ok(Ok(true)) => return Ok(()),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => debug!("Visibility check for {} failed: {}", what, e),
            Err(_) => return Err(timed_out()),
        }

        if started.elapsed() >= timeout {
            return Err(timed_out());
        }
        tokio::time::sleep(interval.min(timeout.saturating_sub(started.elapsed()))).await;
    }
}

/// Quote `value` as a JavaScript string literal
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
