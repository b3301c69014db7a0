//! Owned headless-browser session for portals that only render client side.
//! Intercepted XHR/fetch JSON is buffered into a shared list for the lifetime
//! of the session; DOM anchors are read from the page and same-origin frames.

use std::{
    ffi::OsStr,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use base64::{Engine, prelude::BASE64_STANDARD};
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, warn};
use rand::Rng;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use super::http::FetchError;
use crate::utils::config::ConfigInner;

const CAPTURE_HANDLER: &str = "jobwatch-capture";

fn chrome<T, E: std::fmt::Display>(result: Result<T, E>) -> Result<T, FetchError> {
    result.map_err(|e| FetchError::Browser(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub user_agent: String,
    pub navigation_timeout: Duration,
    pub settle: Duration,
    pub scroll_loops: usize,
}

impl BrowserOptions {
    pub fn from_config(config: &ConfigInner) -> Self {
        BrowserOptions {
            headless: config.browser.headless,
            user_agent: config.http.user_agent.clone(),
            navigation_timeout: Duration::from_secs(config.browser.navigation_timeout_secs),
            settle: Duration::from_millis(config.browser.settle_millis),
            scroll_loops: if config.fast_mode {
                config.browser.fast_scroll_loops
            } else {
                config.browser.scroll_loops
            },
        }
    }
}

/// Which intercepted responses are worth keeping.
#[derive(Debug, Clone, Copy)]
pub struct CaptureFilter {
    /// Substrings of the response URL, any of which qualifies it.
    pub url_contains: &'static [&'static str],
    pub require_json_mime: bool,
}

impl CaptureFilter {
    pub fn matches(&self, url: &str, mime: &str) -> bool {
        let json_ok = !self.require_json_mime || mime.contains("json");
        json_ok && self.url_contains.iter().any(|needle| url.contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Absolute link.
    pub url: String,
    pub text: String,
    /// Location text found on the surrounding card, if asked for.
    pub location: Option<String>,
}

pub struct BrowserSession {
    _browser: Browser,
    tab: Arc<Tab>,
    captured: Arc<Mutex<Vec<Value>>>,
    options: BrowserOptions,
}

impl BrowserSession {
    pub fn launch(options: BrowserOptions, capture: CaptureFilter) -> Result<Self, FetchError> {
        let launch = LaunchOptions {
            headless: options.headless,
            sandbox: false,
            window_size: Some((1366, 900)),
            idle_browser_timeout: options.navigation_timeout * 3,
            args: vec![
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--blink-settings=imagesEnabled=false"),
                OsStr::new("--lang=en-US"),
            ],
            ..Default::default()
        };

        let browser = chrome(Browser::new(launch))?;
        let tab = chrome(browser.new_tab())?;
        tab.set_default_timeout(options.navigation_timeout);
        chrome(tab.set_user_agent(&options.user_agent, Some("en-US,en;q=0.9"), None))?;

        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        chrome(tab.register_response_handling(
            CAPTURE_HANDLER,
            Box::new(move |params, fetch_body| {
                let response = &params.response;
                if !capture.matches(&response.url, &response.mime_type) {
                    return;
                }
                let Ok(body) = fetch_body() else {
                    return;
                };
                let text = if body.base_64_encoded {
                    match BASE64_STANDARD.decode(body.body.as_bytes()) {
                        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                        Err(_) => return,
                    }
                } else {
                    body.body
                };
                let trimmed = text.trim_start();
                if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
                    return;
                }
                if let Ok(value) = serde_json::from_str::<Value>(trimmed)
                    && let Ok(mut sink) = sink.lock()
                {
                    sink.push(value);
                }
            }),
        ))?;

        debug!("browser session started (headless={})", options.headless);
        Ok(BrowserSession {
            _browser: browser,
            tab,
            captured,
            options,
        })
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    /// Sleeps for the settle time scaled by `factor`, with jitter.
    pub fn pause(&self, factor: f64) {
        let base = self.options.settle.as_millis() as f64 * factor;
        let jitter = rand::thread_rng().gen_range(0.8..1.25);
        thread::sleep(Duration::from_millis((base * jitter) as u64));
    }

    pub fn open(&self, url: &str) -> Result<(), FetchError> {
        debug!("navigating to {url}");
        chrome(self.tab.navigate_to(url))?;
        chrome(self.tab.wait_until_navigated())?;
        self.pause(1.0);
        Ok(())
    }

    pub fn current_url(&self) -> String {
        self.tab.get_url()
    }

    fn evaluate(&self, js: &str) -> Option<Value> {
        match self.tab.evaluate(js, false) {
            Ok(object) => object.value,
            Err(e) => {
                debug!("script evaluation failed: {e}");
                None
            }
        }
    }

    pub fn eval_bool(&self, js: &str) -> bool {
        matches!(self.evaluate(js), Some(Value::Bool(true)))
    }

    /// Runs an expression and returns its value round-tripped through
    /// `JSON.stringify`, so arrays and objects survive the protocol.
    pub fn eval_json(&self, expression: &str) -> Result<Value, FetchError> {
        let wrapped = format!("JSON.stringify(({expression}))");
        match self.evaluate(&wrapped) {
            Some(Value::String(json)) => Ok(serde_json::from_str(&json)?),
            _ => Err(FetchError::Shape("script returned no json")),
        }
    }

    pub fn page_height(&self) -> f64 {
        self.evaluate("document.body ? document.body.scrollHeight : 0")
            .and_then(|v| v.as_f64())
            .unwrap_or_default()
    }

    /// Clicks the first visible element under `selector` whose label matches
    /// the case-insensitive regex `pattern`.
    pub fn click_matching(&self, selector: &str, pattern: &str) -> bool {
        let (Ok(selector), Ok(pattern)) = (
            serde_json::to_string(selector),
            serde_json::to_string(pattern),
        ) else {
            return false;
        };
        let js = format!(
            r#"(() => {{
                const re = new RegExp({pattern}, 'i');
                for (const el of document.querySelectorAll({selector})) {{
                    const label = (el.innerText || el.getAttribute('aria-label') || '').trim();
                    if (el.offsetParent !== null && re.test(label)) {{ el.click(); return true; }}
                }}
                return false;
            }})()"#
        );
        self.eval_bool(&js)
    }

    /// Clicks up to `cap` visible, unchecked elements whose label matches
    /// `pattern`. Returns how many were clicked.
    pub fn click_all_matching(&self, selector: &str, pattern: &str, cap: usize) -> usize {
        let (Ok(selector), Ok(pattern)) = (
            serde_json::to_string(selector),
            serde_json::to_string(pattern),
        ) else {
            return 0;
        };
        let js = format!(
            r#"(() => {{
                const re = new RegExp({pattern}, 'i');
                let clicked = 0;
                for (const el of document.querySelectorAll({selector})) {{
                    if (clicked >= {cap}) break;
                    const label = (el.innerText || el.getAttribute('aria-label') || '').trim();
                    const box = el.matches('input') ? el : el.querySelector('input[type=checkbox]');
                    if (box && box.checked) continue;
                    if (el.offsetParent !== null && re.test(label)) {{ el.click(); clicked += 1; }}
                }}
                return clicked;
            }})()"#
        );
        self.evaluate(&js)
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or_default()
    }

    /// Clicks the first visible, enabled element matched by any selector.
    pub fn click_first(&self, selectors: &[&str]) -> bool {
        let Ok(selectors) = serde_json::to_string(selectors) else {
            return false;
        };
        let js = format!(
            r#"(() => {{
                for (const sel of {selectors}) {{
                    const el = document.querySelector(sel);
                    if (el && !el.disabled && el.offsetParent !== null) {{ el.click(); return true; }}
                }}
                return false;
            }})()"#
        );
        self.eval_bool(&js)
    }

    /// Focuses the first matching input, types `text` and submits with Enter.
    pub fn type_into(&self, selectors: &[&str], text: &str) -> bool {
        for selector in selectors {
            let Ok(element) = self.tab.find_element(selector) else {
                continue;
            };
            let typed = element
                .click()
                .and_then(|_| self.tab.type_str(text))
                .and_then(|tab| tab.press_key("Enter"));
            match typed {
                Ok(_) => {
                    self.pause(1.0);
                    return true;
                }
                Err(e) => debug!("typing into {selector} failed: {e}"),
            }
        }
        false
    }

    /// Scrolls to the bottom until the page height holds still for two
    /// consecutive checks. `each` runs after every scroll (e.g. clicking a
    /// "load more" button) and returns whether it changed anything.
    pub fn scroll_until_stable(&self, max_loops: usize, mut each: impl FnMut(&Self) -> bool) -> usize {
        let mut last_height = -1.0;
        let mut stable = 0;

        for round in 0..max_loops {
            self.evaluate("window.scrollTo(0, document.body.scrollHeight)");
            self.pause(0.6);
            let acted = each(self);

            let height = self.page_height();
            if height <= last_height && !acted {
                stable += 1;
                if stable >= 2 {
                    debug!("page settled after {} scrolls", round + 1);
                    return round + 1;
                }
            } else {
                stable = 0;
                last_height = height;
            }
        }

        max_loops
    }

    pub fn html(&self) -> Result<String, FetchError> {
        chrome(self.tab.get_content())
    }

    /// Documents of same-origin iframes; cross-origin frames are skipped.
    pub fn frame_html(&self) -> Vec<String> {
        let js = "Array.from(document.querySelectorAll('iframe')).map(f => { try { return f.contentDocument ? f.contentDocument.documentElement.outerHTML : null; } catch (e) { return null; } }).filter(Boolean)";
        match self.eval_json(js) {
            Ok(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Anchors from the page and its same-origin frames.
    pub fn anchors(&self, base: &Url, selector: &str, location_selector: Option<&str>) -> Vec<Anchor> {
        let mut documents = Vec::new();
        match self.html() {
            Ok(html) => documents.push(html),
            Err(e) => warn!("could not read page content: {e}"),
        }
        documents.extend(self.frame_html());

        documents
            .iter()
            .flat_map(|html| parse_anchors(html, base, selector, location_selector))
            .collect()
    }

    pub fn captured_len(&self) -> usize {
        self.captured.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn take_captured(&self) -> Vec<Value> {
        self.captured
            .lock()
            .map(|mut c| std::mem::take(&mut *c))
            .unwrap_or_default()
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.deregister_response_handling(CAPTURE_HANDLER) {
            debug!("could not remove response handler: {e}");
        }
        if let Err(e) = self.tab.close(false) {
            debug!("could not close tab: {e}");
        }
        debug!("browser session closed");
    }
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses anchors out of an HTML document. Link text falls back to
/// `aria-label`/`title`; when `location_selector` is given, the nearest
/// enclosing card (up to four levels up) is searched for location text.
pub fn parse_anchors(html: &str, base: &Url, selector: &str, location_selector: Option<&str>) -> Vec<Anchor> {
    let Ok(anchor_sel) = Selector::parse(selector) else {
        warn!("invalid anchor selector {selector}");
        return Vec::new();
    };
    let location_sel = location_selector.and_then(|s| Selector::parse(s).ok());
    let document = Html::parse_document(html);

    document
        .select(&anchor_sel)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = super::fields::resolve_url(base, href)?;

            let mut text = squash(&element.text().collect::<Vec<_>>().join(" "));
            if text.is_empty() {
                text = element
                    .value()
                    .attr("aria-label")
                    .or_else(|| element.value().attr("title"))
                    .map(squash)
                    .unwrap_or_default();
            }

            let location = location_sel
                .as_ref()
                .and_then(|sel| card_text(element, &anchor_sel, sel));

            Some(Anchor { url, text, location })
        })
        .collect()
}

/// Walks up from the anchor while the ancestor still holds only this one
/// link, so a neighbouring card's location is never borrowed.
fn card_text(anchor: ElementRef<'_>, anchors: &Selector, selector: &Selector) -> Option<String> {
    anchor
        .ancestors()
        .take(4)
        .filter_map(ElementRef::wrap)
        .take_while(|card| card.select(anchors).count() <= 1)
        .find_map(|card| card.select(selector).next())
        .map(|hit| squash(&hit.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
}
