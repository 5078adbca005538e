#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pricewatch_lib::pricewatch_fetch::{Error, FetchRequest, Fetcher, PageBody};
use pricewatch_lib::{Owner, Tracker};

/// What the fake fetcher does for one request.
#[derive(Debug, Clone)]
pub enum Step {
    Page(PageBody),
    Fail,
    Panic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub url: String,
    pub render: bool,
    pub wait_for: Option<String>,
}

/// Replays scripted responses per (url, render). The last step of a script
/// repeats forever; unknown pages are 404s.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<(String, bool), VecDeque<Step>>>,
    calls: Mutex<Vec<Call>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn script(self, url: &str, render: bool, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert((url.to_string(), render), steps.into());
        self
    }

    pub fn page(self, url: &str, html: &str) -> Self {
        self.script(url, false, vec![Step::Page(PageBody::Document(html.to_string()))])
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|c| c.url == url).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, req: FetchRequest<'_>) -> Result<PageBody, Error> {
        self.calls.lock().unwrap().push(Call {
            url: req.url.to_string(),
            render: req.render,
            wait_for: req.wait_for.map(str::to_string),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&(req.url.to_string(), req.render)) {
                Some(steps) if steps.len() > 1 => steps.pop_front(),
                Some(steps) => steps.front().cloned(),
                None => None,
            }
        };
        match step {
            Some(Step::Page(body)) => Ok(body),
            Some(Step::Fail) => Err(Error::Timeout(Duration::from_secs(1))),
            Some(Step::Panic) => panic!("scripted panic for {}", req.url),
            None => Err(Error::HttpStatus {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

pub fn tracker(id: u32, url: &str, selectors: &[&str]) -> Tracker {
    Tracker {
        id,
        uuid: format!("uuid-{}", id),
        owner: Owner::global("test"),
        name: format!("tracker {}", id),
        url: url.to_string(),
        selectors: selectors.iter().map(|s| s.to_string()).collect(),
        active_selector: selectors.first().map(|s| s.to_string()),
        render_required: false,
        auto_detect: selectors.is_empty(),
        current_price: None,
    }
}

pub fn product_page(price_html: &str) -> String {
    format!(
        "<html>\n<head><title>Product</title></head>\n<body>\n<h1>Desk lamp</h1>\n{}\n<p>Free shipping on all orders over fifty.</p>\n</body>\n</html>",
        price_html
    )
}
