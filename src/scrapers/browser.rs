use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::BrowserConfig;

use super::error::{BrowserError, BrowserResult};
use super::traits::{BrowserSession, PageTab, ScrollPosition};

/// A headless Chrome tab
pub struct ChromeTab {
    tab: Arc<Tab>,
}

impl ChromeTab {
    fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    fn eval(&self, expression: &str) -> BrowserResult<Value> {
        let remote = self
            .tab
            .evaluate(expression, false)
            .map_err(BrowserError::protocol)?;
        Ok(remote.value.unwrap_or(Value::Null))
    }

    /// Runs a script that returns `false` when its target element is missing
    fn eval_on_element(&self, selector: &str, action: &str) -> BrowserResult<()> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; {action}; return true; }})()",
            js_string(selector)
        );
        match self.eval(&script)? {
            Value::Bool(true) => Ok(()),
            _ => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }
}

fn js_string(raw: &str) -> String {
    serde_json::to_string(raw).unwrap_or_else(|_| "\"\"".to_string())
}

impl PageTab for ChromeTab {
    fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.tab
            .navigate_to(url)
            .map_err(|err| BrowserError::navigation(url, format!("{err:#}")))?;
        self.tab
            .wait_until_navigated()
            .map_err(|err| BrowserError::navigation(url, format!("{err:#}")))?;
        Ok(())
    }

    fn location(&self) -> BrowserResult<String> {
        match self.eval("window.location.href")? {
            Value::String(href) => Ok(href),
            other => Err(BrowserError::Script(other.to_string())),
        }
    }

    fn content(&self) -> BrowserResult<String> {
        self.tab.get_content().map_err(BrowserError::protocol)
    }

    fn wait_for(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|_| BrowserError::Timeout(selector.to_string()))
    }

    fn count(&self, selector: &str) -> BrowserResult<usize> {
        let script = format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        );
        match self.eval(&script)? {
            Value::Number(n) => Ok(n.as_u64().unwrap_or(0) as usize),
            other => Err(BrowserError::Script(other.to_string())),
        }
    }

    fn attribute(
        &self,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> BrowserResult<Option<String>> {
        let element = self
            .tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .get_attribute_value(name)
            .map_err(BrowserError::protocol)
    }

    fn scroll_to(&self, position: ScrollPosition) -> BrowserResult<()> {
        let script = match position {
            ScrollPosition::Top => "window.scrollTo(0, 0)".to_string(),
            ScrollPosition::Offset(px) => format!("window.scrollTo(0, {px})"),
            ScrollPosition::Fraction(fraction) => format!(
                "window.scrollTo(0, document.body.scrollHeight * {})",
                fraction.clamp(0.0, 1.0)
            ),
            ScrollPosition::Bottom => "window.scrollTo(0, document.body.scrollHeight)".to_string(),
        };
        self.eval(&script).map(|_| ())
    }

    fn scroll_into_view(&self, selector: &str) -> BrowserResult<()> {
        self.eval_on_element(selector, "el.scrollIntoView({block: 'center'})")
    }

    fn click(&self, selector: &str) -> BrowserResult<()> {
        // script click survives overlays that swallow synthetic mouse events
        self.eval_on_element(selector, "el.click()")
    }

    fn click_buttons_containing(&self, label: &str) -> BrowserResult<usize> {
        let script = format!(
            "(() => {{ let n = 0; for (const b of document.querySelectorAll('button')) {{ if ((b.innerText || '').includes({})) {{ b.click(); n++; }} }} return n; }})()",
            js_string(label)
        );
        match self.eval(&script)? {
            Value::Number(n) => Ok(n.as_u64().unwrap_or(0) as usize),
            other => Err(BrowserError::Script(other.to_string())),
        }
    }

    fn activate(&self) -> BrowserResult<()> {
        self.tab
            .activate()
            .map(|_| ())
            .map_err(BrowserError::protocol)
    }

    fn close(&self) -> BrowserResult<()> {
        self.tab
            .close(true)
            .map(|_| ())
            .map_err(BrowserError::protocol)
    }
}

/// Headless Chrome session that rebuilds itself when the browser dies
pub struct ChromeSession {
    config: BrowserConfig,
    browser: Browser,
    home: ChromeTab,
    generation: u64,
}

impl ChromeSession {
    /// Launch Chrome with the given configuration
    pub fn launch(config: BrowserConfig) -> BrowserResult<Self> {
        let (browser, home) = start(&config)?;
        Ok(Self {
            config,
            browser,
            home,
            generation: 0,
        })
    }

    fn probe(&self) -> bool {
        if let Err(err) = self.browser.get_version() {
            debug!(error = %format!("{err:#}"), "Browser version probe failed");
            return false;
        }
        match self.home.location() {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, "Results tab probe failed");
                false
            }
        }
    }
}

fn start(config: &BrowserConfig) -> BrowserResult<(Browser, ChromeTab)> {
    info!(headless = config.headless, "Launching Chrome...");

    let mut args: Vec<OsString> = vec![
        OsString::from("--disable-blink-features=AutomationControlled"),
        OsString::from("--disable-dev-shm-usage"),
    ];
    if let Some(user_agent) = config.pick_user_agent() {
        debug!(user_agent, "Selected identity string");
        args.push(OsString::from(format!("--user-agent={user_agent}")));
    }
    args.extend(config.extra_args.iter().map(OsString::from));

    let options = LaunchOptions::default_builder()
        .headless(config.headless)
        .sandbox(false)
        .window_size(Some((config.window_width, config.window_height)))
        .idle_browser_timeout(Duration::from_secs(config.idle_timeout_secs))
        .args(args.iter().map(OsString::as_os_str).collect())
        .build()
        .map_err(|err| BrowserError::Launch(err.to_string()))?;

    let browser = Browser::new(options).map_err(|err| BrowserError::Launch(format!("{err:#}")))?;
    let tab = browser.new_tab().map_err(BrowserError::protocol)?;

    Ok((browser, ChromeTab::new(tab)))
}

impl BrowserSession for ChromeSession {
    type Tab = ChromeTab;

    fn ensure_healthy(&mut self) -> bool {
        if self.probe() {
            return true;
        }

        warn!(
            generation = self.generation,
            "Browser session unresponsive, relaunching"
        );
        match start(&self.config) {
            Ok((browser, home)) => {
                // dropping the old handle shuts the dead process down
                self.browser = browser;
                self.home = home;
                self.generation += 1;
                info!(generation = self.generation, "Browser session recreated");
                true
            }
            Err(err) => {
                error!(error = %err, "Could not relaunch browser");
                false
            }
        }
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn home(&self) -> &ChromeTab {
        &self.home
    }

    fn open_tab(&self) -> BrowserResult<ChromeTab> {
        self.browser
            .new_tab()
            .map(ChromeTab::new)
            .map_err(|err| BrowserError::SessionLost(format!("{err:#}")))
    }
}
