//! CLI subcommand implementations.

pub mod add;
pub mod detect;
pub mod list;
pub mod probe;
pub mod remove;
pub mod scan;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use pricewatch_lib::{DomainSelectorCache, Owner, PageFetcher, ScrapeConfig};
use tracing::warn;

use crate::output::OutputFormat;

/// Settings shared by every subcommand.
pub struct Context {
    pub config: ScrapeConfig,
    pub data: PathBuf,
    pub selectors: PathBuf,
    pub format: OutputFormat,
}

impl Context {
    pub fn fetcher(&self) -> Result<Arc<PageFetcher>> {
        Ok(Arc::new(PageFetcher::new(self.config.fetch_options())?))
    }

    pub fn load_cache(&self) -> Arc<DomainSelectorCache> {
        Arc::new(DomainSelectorCache::load_or_empty(&self.selectors))
    }

    /// Writes the selector cache if anything was discovered.
    pub fn save_cache(&self, cache: &DomainSelectorCache) {
        if !cache.is_dirty() {
            return;
        }
        if let Err(e) = cache.save(&self.selectors) {
            warn!("Could not save selector cache: {}", e);
        }
    }
}

/// Picks a personal list or a shared scope.
#[derive(Args)]
pub struct OwnerArgs {
    /// Use this user's personal tracker list
    #[arg(long, conflicts_with = "scope")]
    pub user: Option<String>,

    /// Shared tracker scope
    #[arg(long, default_value = "default")]
    pub scope: String,
}

impl OwnerArgs {
    pub fn owner(&self) -> Owner {
        match &self.user {
            Some(user) => Owner::user(user.clone()),
            None => Owner::global(self.scope.clone()),
        }
    }
}
