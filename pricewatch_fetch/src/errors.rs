//! Error types for page fetching.

/// Errors that can occur while fetching a page.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The URL could not be parsed or has an unsupported scheme.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// An HTTP request failed (connection refused, TLS, body read, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// The server returned a non-success status with a body snippet.
    #[error("request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The headless browser could not be launched or driven.
    #[error("render failed: {0}")]
    Render(String),
    /// A render-backed fetch was requested from a fetcher without a browser.
    #[error("render-backed fetch is not supported by this fetcher")]
    RenderUnsupported,
}

impl Error {
    /// Whether retrying the same request later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) | Self::Render(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidUrl(_) | Self::RenderUnsupported => false,
        }
    }
}
