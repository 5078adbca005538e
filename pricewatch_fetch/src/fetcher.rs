//! The [`Fetcher`] abstraction shared by the lightweight and render-backed
//! strategies.

use std::time::Duration;

use async_trait::async_trait;

use crate::client::HttpFetcher;
use crate::render::RenderFetcher;
use crate::Error;

/// Tunables for both fetch strategies.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Hard ceiling for a lightweight GET.
    pub timeout: Duration,
    /// Bounded wait for the target element during a render-backed fetch.
    pub render_wait: Duration,
    /// Size of the blocking worker pool for browser sessions.
    pub render_workers: usize,
    /// Bodies shorter than this are logged as suspicious.
    pub min_body_len: usize,
    /// Fixed user agent; a random browser agent is used when `None`.
    pub user_agent: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            render_wait: Duration::from_secs(15),
            render_workers: 2,
            min_body_len: 100,
            user_agent: None,
        }
    }
}

/// One page request.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    /// Use a headless browser instead of a plain GET.
    pub render: bool,
    /// Selector whose element should hold non-empty text before the page
    /// is captured. Only meaningful for render-backed requests.
    pub wait_for: Option<&'a str>,
}

impl<'a> FetchRequest<'a> {
    pub fn light(url: &'a str) -> Self {
        Self {
            url,
            render: false,
            wait_for: None,
        }
    }

    pub fn rendered(url: &'a str, wait_for: Option<&'a str>) -> Self {
        Self {
            url,
            render: true,
            wait_for,
        }
    }

    pub fn new(url: &'a str, render: bool, wait_for: Option<&'a str>) -> Self {
        if render {
            Self::rendered(url, wait_for)
        } else {
            Self::light(url)
        }
    }
}

/// Markup returned by a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBody {
    /// A whole document (static GET, or a render whose target was not found).
    Document(String),
    /// The outer markup of the single element named by `wait_for`.
    Fragment(String),
}

impl PageBody {
    pub fn markup(&self) -> &str {
        match self {
            Self::Document(s) | Self::Fragment(s) => s,
        }
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self, Self::Fragment(_))
    }
}

/// Obtains page content for a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, req: FetchRequest<'_>) -> Result<PageBody, Error>;
}

/// Routes each request to the HTTP or the headless-browser strategy.
pub struct PageFetcher {
    http: HttpFetcher,
    render: RenderFetcher,
}

impl PageFetcher {
    pub fn new(options: FetchOptions) -> Result<Self, Error> {
        Ok(Self {
            http: HttpFetcher::new(&options)?,
            render: RenderFetcher::new(&options),
        })
    }
}

#[async_trait]
impl Fetcher for PageFetcher {
    async fn fetch(&self, req: FetchRequest<'_>) -> Result<PageBody, Error> {
        if req.render {
            self.render.render(req.url, req.wait_for).await
        } else {
            self.http.get(req.url).await.map(PageBody::Document)
        }
    }
}

/// Logs bodies too short to plausibly hold a product page.
///
/// A short body usually means a JS-only shell, but it is still handed on.
pub(crate) fn check_body_len(url: &str, body: &str, min_body_len: usize) {
    let len = body.chars().count();
    if len < min_body_len {
        tracing::warn!(
            "Suspiciously short body from {} ({} chars); page may need rendering",
            url,
            len
        );
    }
}
