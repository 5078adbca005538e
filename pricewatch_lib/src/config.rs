//! Scrape cycle configuration.
//!
//! Defaults can be overridden from a YAML file and then from `PRICEWATCH_*`
//! environment variables, in that order.

use std::path::Path;
use std::time::Duration;

use pricewatch_fetch::FetchOptions;
use serde::Deserialize;

use crate::error::PricewatchError;

/// Tunables for one scrape cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeConfig {
    /// Concurrent render-backed trackers.
    pub render_concurrency: usize,
    /// Concurrent HTTP-only trackers.
    pub light_concurrency: usize,
    /// Extra rounds for trackers that produced no price.
    pub retries: usize,
    /// Fixed pause before each retry round.
    pub retry_delay: Duration,
    pub fetch_timeout: Duration,
    /// Bounded wait for the target element in a render.
    pub render_wait: Duration,
    /// Bodies shorter than this are logged as suspicious.
    pub min_body_len: usize,
    pub user_agent: Option<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            render_concurrency: 2,
            light_concurrency: 4,
            retries: 1,
            retry_delay: Duration::from_secs(3),
            fetch_timeout: Duration::from_secs(10),
            render_wait: Duration::from_secs(15),
            min_body_len: 100,
            user_agent: None,
        }
    }
}

/// On-disk shape: every field optional, durations in plain units.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    render_concurrency: Option<usize>,
    light_concurrency: Option<usize>,
    retries: Option<usize>,
    retry_delay_ms: Option<u64>,
    fetch_timeout_secs: Option<u64>,
    render_wait_secs: Option<u64>,
    min_body_len: Option<usize>,
    user_agent: Option<String>,
}

impl ScrapeConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies `PRICEWATCH_*` variables on top of `self`.
    pub fn with_env_overrides(self) -> Self {
        Self {
            render_concurrency: env_usize("PRICEWATCH_RENDER_CONCURRENCY", self.render_concurrency)
                .max(1),
            light_concurrency: env_usize("PRICEWATCH_LIGHT_CONCURRENCY", self.light_concurrency)
                .max(1),
            retries: env_usize("PRICEWATCH_RETRIES", self.retries),
            retry_delay: Duration::from_millis(env_u64(
                "PRICEWATCH_RETRY_DELAY_MS",
                self.retry_delay.as_millis() as u64,
            )),
            fetch_timeout: Duration::from_secs(env_u64(
                "PRICEWATCH_FETCH_TIMEOUT_SECS",
                self.fetch_timeout.as_secs(),
            )),
            render_wait: Duration::from_secs(env_u64(
                "PRICEWATCH_RENDER_WAIT_SECS",
                self.render_wait.as_secs(),
            )),
            min_body_len: env_usize("PRICEWATCH_MIN_BODY_LEN", self.min_body_len),
            user_agent: std::env::var("PRICEWATCH_USER_AGENT")
                .ok()
                .filter(|ua| !ua.trim().is_empty())
                .or(self.user_agent),
        }
    }

    /// Parses a YAML document over the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PricewatchError> {
        let file: ConfigFile = serde_yml::from_str(yaml)
            .map_err(|e| PricewatchError::Config(format!("invalid config: {}", e)))?;
        let d = Self::default();
        let config = Self {
            render_concurrency: file.render_concurrency.unwrap_or(d.render_concurrency),
            light_concurrency: file.light_concurrency.unwrap_or(d.light_concurrency),
            retries: file.retries.unwrap_or(d.retries),
            retry_delay: file
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(d.retry_delay),
            fetch_timeout: file
                .fetch_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(d.fetch_timeout),
            render_wait: file
                .render_wait_secs
                .map(Duration::from_secs)
                .unwrap_or(d.render_wait),
            min_body_len: file.min_body_len.unwrap_or(d.min_body_len),
            user_agent: file.user_agent.or(d.user_agent),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads a YAML config file.
    pub fn load_yaml(path: &Path) -> Result<Self, PricewatchError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            PricewatchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<(), PricewatchError> {
        if self.render_concurrency == 0 || self.light_concurrency == 0 {
            return Err(PricewatchError::Config(
                "concurrency limits must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(PricewatchError::Config(
                "fetch timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Options for the page fetcher. The render worker pool matches the
    /// render concurrency.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.fetch_timeout,
            render_wait: self.render_wait,
            render_workers: self.render_concurrency,
            min_body_len: self.min_body_len,
            user_agent: self.user_agent.clone(),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(default)
}
