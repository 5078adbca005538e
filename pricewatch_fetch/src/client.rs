//! Lightweight HTTP fetching.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::fetcher::{check_body_len, FetchOptions, FetchRequest, Fetcher, PageBody};
use crate::user_agent::get_user_agent;
use crate::Error;

/// Plain HTTP GET fetcher.
///
/// Sends browser-like headers with a randomized user agent and enforces a
/// per-request timeout. The body is returned as-is, even when it is short.
pub struct HttpFetcher {
    http: reqwest::Client,
    timeout: Duration,
    min_body_len: usize,
    user_agent: Option<String>,
}

impl HttpFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            http,
            timeout: options.timeout,
            min_body_len: options.min_body_len,
            user_agent: options.user_agent.clone(),
        })
    }

    /// Fetches `url` and returns the response body.
    pub async fn get(&self, url: &str) -> Result<String, Error> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!("unsupported scheme {}", url.scheme())));
        }

        let user_agent = self.user_agent.as_deref().unwrap_or_else(|| get_user_agent());
        let resp = self
            .http
            .get(url.clone())
            .header("user-agent", user_agent)
            .header(
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("accept-language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| self.map_send_error(url.as_str(), e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| self.map_send_error(url.as_str(), e))?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("GET {} failed with status {}: {}", url, status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        check_body_len(url.as_str(), &body, self.min_body_len);
        Ok(body)
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            tracing::warn!("GET {} timed out after {:?}", url, self.timeout);
            Error::Timeout(self.timeout)
        } else {
            tracing::error!("GET {} failed: {}", url, e);
            Error::Http(e)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, req: FetchRequest<'_>) -> Result<PageBody, Error> {
        if req.render {
            return Err(Error::RenderUnsupported);
        }
        self.get(req.url).await.map(PageBody::Document)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_body_untouched() {
        assert_eq!(truncate_body("ok"), "ok");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "€".repeat(1000);
        let out = truncate_body(&body);
        assert!(out.ends_with("...[truncated]"));
        assert!(out.len() < body.len());
    }
}
