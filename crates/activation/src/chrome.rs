use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use tracing::{debug, info, warn};

use inviteflow_core::config::BrowserConfig;
use inviteflow_core::FlowError;

use crate::page::PageDriver;

struct Inner {
    // Dropping the Browser closes Chrome, so it lives alongside the tab.
    _browser: Browser,
    tab: Arc<Tab>,
}

/// Headless-Chrome backed [`PageDriver`]. All page interaction goes through
/// JavaScript evaluation on the active tab, which survives client-side
/// routing better than CDP element handles do.
pub struct ChromeSession {
    config: BrowserConfig,
    inner: Mutex<Inner>,
}

impl ChromeSession {
    pub fn launch(config: &BrowserConfig) -> Result<Self, FlowError> {
        let inner = launch_inner(config)?;
        Ok(Self {
            config: config.clone(),
            inner: Mutex::new(inner),
        })
    }

    fn tab(&self) -> Result<Arc<Tab>, FlowError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| FlowError::Browser("browser session lock poisoned".into()))?;
        Ok(guard.tab.clone())
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, FlowError> {
        let tab = self.tab()?;
        let result = tab
            .evaluate(expression, false)
            .map_err(|e| FlowError::Browser(format!("script evaluation failed: {}", e)))?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Wait until the page stops looking like a loading shell. Expiry is
    /// logged and tolerated; a slow page gets classified as-is.
    async fn settle(&self) -> Result<(), FlowError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.settle_timeout_seconds);
        loop {
            let html = self.content().await.unwrap_or_default();
            let lower = html.to_lowercase();
            let loading = lower.contains("loading") || lower.contains("please wait");
            let has_content =
                html.contains("<input") || html.contains("<form") || html.len() > 5000;
            if has_content && !loading {
                break;
            }
            if Instant::now() >= deadline {
                warn!("page did not settle within timeout, proceeding with current state");
                break;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(())
    }
}

fn launch_inner(config: &BrowserConfig) -> Result<Inner, FlowError> {
    let mut builder = LaunchOptionsBuilder::default();
    builder
        .headless(config.headless)
        .window_size(Some((config.window_width, config.window_height)))
        .args(vec![
            std::ffi::OsStr::new("--no-sandbox"),
            std::ffi::OsStr::new("--disable-dev-shm-usage"),
            std::ffi::OsStr::new("--disable-gpu"),
        ]);
    if let Ok(path) = std::env::var("CHROME_PATH") {
        builder.path(Some(path.into()));
    }
    let options = builder
        .build()
        .map_err(|e| FlowError::Browser(format!("invalid launch options: {}", e)))?;
    let browser =
        Browser::new(options).map_err(|e| FlowError::Browser(format!("launch failed: {}", e)))?;
    let tab = browser
        .new_tab()
        .map_err(|e| FlowError::Browser(format!("could not open tab: {}", e)))?;
    info!(headless = config.headless, "browser session started");
    Ok(Inner {
        _browser: browser,
        tab,
    })
}

fn js_escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
}

#[async_trait]
impl PageDriver for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<(), FlowError> {
        debug!(url, "navigating");
        let tab = self.tab()?;
        tab.navigate_to(url)
            .map_err(|e| FlowError::Browser(format!("navigation to {} failed: {}", url, e)))?;
        tab.wait_until_navigated()
            .map_err(|e| FlowError::Browser(format!("navigation did not complete: {}", e)))?;
        self.settle().await
    }

    async fn content(&self) -> Result<String, FlowError> {
        let tab = self.tab()?;
        tab.get_content()
            .map_err(|e| FlowError::Browser(format!("could not read page content: {}", e)))
    }

    async fn current_url(&self) -> Result<String, FlowError> {
        Ok(self.tab()?.get_url())
    }

    async fn title(&self) -> Result<String, FlowError> {
        self.tab()?
            .get_title()
            .map_err(|e| FlowError::Browser(format!("could not read page title: {}", e)))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), FlowError> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector('{sel}');
                if (!el) return false;
                el.focus();
                el.value = '{val}';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            sel = js_escape(selector),
            val = js_escape(value),
        );
        match self.evaluate(&script).await?.as_bool() {
            Some(true) => Ok(()),
            _ => Err(FlowError::Browser(format!(
                "no element matched selector {}",
                selector
            ))),
        }
    }

    async fn click(&self, selector: &str) -> Result<(), FlowError> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector('{sel}');
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            sel = js_escape(selector),
        );
        match self.evaluate(&script).await?.as_bool() {
            Some(true) => Ok(()),
            _ => Err(FlowError::Browser(format!(
                "no element matched selector {}",
                selector
            ))),
        }
    }

    async fn click_button_with_text(&self, labels: &[&str]) -> Result<bool, FlowError> {
        let labels_json = serde_json::to_string(labels)
            .map_err(|e| FlowError::Browser(format!("label encoding failed: {}", e)))?;
        let script = format!(
            r#"(() => {{
                const labels = {labels}.map(l => l.toLowerCase());
                const buttons = document.querySelectorAll('button, input[type="submit"]');
                for (const b of buttons) {{
                    const text = (b.innerText || b.value || '').toLowerCase();
                    if (labels.some(l => text.includes(l))) {{
                        b.click();
                        return true;
                    }}
                }}
                return false;
            }})()"#,
            labels = labels_json,
        );
        Ok(self.evaluate(&script).await?.as_bool().unwrap_or(false))
    }

    async fn check_checkbox(&self, index: usize) -> Result<(), FlowError> {
        let script = format!(
            r#"(() => {{
                const boxes = document.querySelectorAll('input[type="checkbox"]');
                const box = boxes[{index}];
                if (!box) return false;
                if (!box.checked) box.click();
                return true;
            }})()"#,
            index = index,
        );
        match self.evaluate(&script).await?.as_bool() {
            Some(true) => Ok(()),
            _ => Err(FlowError::Browser(format!(
                "no checkbox at index {}",
                index
            ))),
        }
    }

    async fn screenshot(&self, path: &Path) -> Result<(), FlowError> {
        let tab = self.tab()?;
        let png = tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| FlowError::Browser(format!("screenshot failed: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FlowError::Browser(format!("could not create {:?}: {}", parent, e)))?;
        }
        std::fs::write(path, png)
            .map_err(|e| FlowError::Browser(format!("could not write {:?}: {}", path, e)))?;
        debug!(?path, "screenshot saved");
        Ok(())
    }

    /// Best-effort storage clear, then a fresh browser so cookies and
    /// permissions are gone for certain. Storage APIs may be unavailable
    /// before the first navigation, so those failures are only logged.
    async fn reset_session(&self) -> Result<(), FlowError> {
        let clear = r#"(() => {
            try { localStorage.clear(); } catch (e) {}
            try { sessionStorage.clear(); } catch (e) {}
            return true;
        })()"#;
        if let Err(e) = self.evaluate(clear).await {
            debug!(error = %e, "storage clear skipped");
        }

        let fresh = launch_inner(&self.config)?;
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| FlowError::Browser("browser session lock poisoned".into()))?;
        *guard = fresh;
        debug!("browser session reset");
        Ok(())
    }
}
