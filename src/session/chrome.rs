use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{PageSession, SlateControl};
use crate::config::BrowserConfig;
use crate::utils::error::{AppError, Result};
use crate::utils::text::collapse_whitespace;

/// A single browser tab driven over the DevTools protocol.
pub struct ChromeSession {
    // Dropping the browser terminates the Chrome process
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let user_agent_arg = format!("--user-agent={}", config.user_agent);
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(Duration::from_secs(config.navigation_timeout_secs.max(30) * 4))
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-background-timer-throttling"),
                OsStr::new("--disable-renderer-backgrounding"),
                OsStr::new(&user_agent_arg),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(config.navigation_timeout_secs));
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| AppError::Browser(format!("Failed to set user agent: {}", e)))?;

        tracing::info!(headless = config.headless, "Browser launched");

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn evaluate(&self, script: &str) -> Result<Option<serde_json::Value>> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| AppError::Browser(format!("Script evaluation failed: {}", e)))?;
        Ok(result.value)
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| AppError::Browser(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| AppError::Browser(format!("Page load failed: {}", e)))?;
        tracing::debug!(url, "Page loaded");
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))
    }

    async fn row_count(&self, table_selector: &str, row_selector: &str) -> Result<Option<usize>> {
        let script = format!(
            r#"
            (function() {{
                const table = document.querySelector({table});
                if (!table) {{
                    return -1;
                }}
                return table.querySelectorAll({row}).length;
            }})()
            "#,
            table = serde_json::to_string(table_selector)?,
            row = serde_json::to_string(row_selector)?,
        );

        let count = self.evaluate(&script)?.and_then(|v| v.as_i64()).unwrap_or(-1);
        Ok(usize::try_from(count).ok())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.evaluate("window.scrollTo(0, document.body.scrollHeight)")?;
        Ok(())
    }

    async fn scroll_by(&self, pixels: i64) -> Result<()> {
        self.evaluate(&format!("window.scrollBy(0, {})", pixels))?;
        Ok(())
    }

    async fn scroll_to_top(&self) -> Result<()> {
        self.evaluate("window.scrollTo(0, 0)")?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let script = format!(
            r#"
            (function() {{
                const target = Array.from(document.querySelectorAll({selector}))
                    .find(el => el.offsetParent !== null && !el.disabled);
                if (!target) {{
                    return false;
                }}
                target.click();
                return true;
            }})()
            "#,
            selector = serde_json::to_string(selector)?,
        );

        let clicked = self.evaluate(&script)?.and_then(|v| v.as_bool()).unwrap_or(false);
        if clicked {
            tracing::debug!(selector, "Clicked element");
        }
        Ok(clicked)
    }

    async fn select_option(&self, control: &SlateControl, label: &str) -> Result<()> {
        let script = format!(
            r#"
            (function() {{
                const controls = document.querySelectorAll({selector});
                const control = controls[{index}];
                if (!control) {{
                    return "no-control";
                }}
                const wanted = {label};
                const option = Array.from(control.options || [])
                    .find(o => o.textContent.replace(/\s+/g, " ").trim() === wanted);
                if (!option) {{
                    return "no-option";
                }}
                control.value = option.value;
                option.selected = true;
                control.dispatchEvent(new Event("input", {{ bubbles: true }}));
                control.dispatchEvent(new Event("change", {{ bubbles: true }}));
                return "ok";
            }})()
            "#,
            selector = serde_json::to_string(&control.selector)?,
            index = control.index,
            label = serde_json::to_string(&collapse_whitespace(label))?,
        );

        let status = self.evaluate(&script)?;
        match status.as_ref().and_then(|v| v.as_str()) {
            Some("ok") => Ok(()),
            Some("no-control") => Err(AppError::SlateSelection {
                slate: label.to_string(),
                message: format!("control {} is no longer attached", control),
            }),
            Some("no-option") => Err(AppError::SlateSelection {
                slate: label.to_string(),
                message: "option not found".to_string(),
            }),
            other => Err(AppError::SlateSelection {
                slate: label.to_string(),
                message: format!("unexpected selection result: {:?}", other),
            }),
        }
    }

    async fn close(&self) -> Result<()> {
        self.tab
            .close(true)
            .map_err(|e| AppError::Browser(format!("Failed to close tab: {}", e)))?;
        tracing::debug!("Browser tab closed");
        Ok(())
    }
}
