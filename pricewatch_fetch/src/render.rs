//! Render-backed fetching through a headless Chrome session.
//!
//! `headless_chrome` is a blocking driver. Each render runs on tokio's
//! blocking pool, and a semaphore sized to the render concurrency limit
//! keeps the number of live browser sessions bounded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tokio::sync::Semaphore;

use crate::fetcher::{check_body_len, FetchOptions, FetchRequest, Fetcher, PageBody};
use crate::user_agent::get_user_agent;
use crate::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Headless-browser fetcher.
pub struct RenderFetcher {
    workers: Arc<Semaphore>,
    settings: RenderSettings,
}

#[derive(Clone)]
struct RenderSettings {
    wait: Duration,
    min_body_len: usize,
    user_agent: Option<String>,
}

impl RenderFetcher {
    pub fn new(options: &FetchOptions) -> Self {
        Self {
            workers: Arc::new(Semaphore::new(options.render_workers.max(1))),
            settings: RenderSettings {
                wait: options.render_wait,
                min_body_len: options.min_body_len,
                user_agent: options.user_agent.clone(),
            },
        }
    }

    /// Renders `url` and captures either the `wait_for` element's outer
    /// markup or, when it never shows up with text, the whole document.
    pub async fn render(&self, url: &str, wait_for: Option<&str>) -> Result<PageBody, Error> {
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|_| Error::Render("render worker pool closed".into()))?;

        let settings = self.settings.clone();
        let url = url.to_string();
        let wait_for = wait_for.map(str::to_string);
        tokio::task::spawn_blocking(move || render_blocking(&settings, &url, wait_for.as_deref()))
            .await
            .map_err(|e| Error::Render(format!("render worker failed: {}", e)))?
    }
}

#[async_trait]
impl Fetcher for RenderFetcher {
    async fn fetch(&self, req: FetchRequest<'_>) -> Result<PageBody, Error> {
        self.render(req.url, req.wait_for).await
    }
}

/// A browser plus its tab. Dropping it closes the tab and then the
/// browser process, whichever way the render exits.
struct RenderSession {
    tab: Arc<Tab>,
    _browser: Browser,
}

impl RenderSession {
    fn launch(settings: &RenderSettings) -> Result<Self, Error> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .idle_browser_timeout(settings.wait + Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Render(format!("invalid launch options: {}", e)))?;
        let browser =
            Browser::new(options).map_err(|e| Error::Render(format!("launch failed: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| Error::Render(format!("new tab failed: {}", e)))?;
        tab.set_default_timeout(settings.wait);
        let ua = settings.user_agent.as_deref().unwrap_or_else(|| get_user_agent());
        if let Err(e) = tab.set_user_agent(ua, None, None) {
            tracing::debug!("Could not override user agent: {}", e);
        }
        Ok(Self {
            tab,
            _browser: browser,
        })
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            tracing::debug!("Closing render tab failed: {}", e);
        }
    }
}

fn render_blocking(
    settings: &RenderSettings,
    url: &str,
    wait_for: Option<&str>,
) -> Result<PageBody, Error> {
    let session = RenderSession::launch(settings)?;
    let tab = &session.tab;

    tab.navigate_to(url)
        .map_err(|e| Error::Render(format!("navigate to {} failed: {}", url, e)))?;
    if let Err(e) = tab.wait_until_navigated() {
        tracing::warn!("Navigation to {} did not settle: {}", url, e);
    }

    if let Some(selector) = wait_for {
        if let Some(fragment) = wait_for_text(tab, selector, settings.wait) {
            return Ok(PageBody::Fragment(fragment));
        }
        tracing::debug!(
            "Element {} never showed text on {}; capturing full document",
            selector,
            url
        );
    }

    let html = tab
        .get_content()
        .map_err(|e| Error::Render(format!("reading content of {} failed: {}", url, e)))?;
    check_body_len(url, &html, settings.min_body_len);
    Ok(PageBody::Document(html))
}

/// Polls until the element matching `selector` has non-empty text, or the
/// deadline passes. Returns the element's outer markup.
fn wait_for_text(tab: &Tab, selector: &str, wait: Duration) -> Option<String> {
    let deadline = Instant::now() + wait;
    loop {
        if let Ok(element) = tab.find_element(selector) {
            let has_text = element
                .get_inner_text()
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false);
            if has_text {
                return element.get_content().ok();
            }
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
