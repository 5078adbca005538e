use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Result};
use clap::Args;
use pricewatch_lib::{
    DomainSelectorCache, JsonTrackerStore, LogNotifier, Scheduler, SelectorResolver,
};
use tracing::{error, info};

use super::Context;
use crate::output::print_report;

#[derive(Args)]
pub struct ScanArgs {
    /// Repeat the scan every N minutes until interrupted
    #[arg(long)]
    pub every: Option<u64>,
}

pub async fn run(args: &ScanArgs, ctx: &Context) -> Result<()> {
    let store = Arc::new(JsonTrackerStore::open(&ctx.data)?);
    let cache = ctx.load_cache();
    let resolver = SelectorResolver::new(ctx.fetcher()?, cache.clone());
    let scheduler = Scheduler::new(resolver, store, Arc::new(LogNotifier), ctx.config.clone());

    let Some(minutes) = args.every else {
        return scan_once(&scheduler, &cache, ctx).await;
    };
    ensure!(minutes > 0, "--every must be at least 1 minute");

    let mut ticker = tokio::time::interval(Duration::from_secs(minutes * 60));
    info!("Scanning every {} minute(s); press Ctrl-C to stop", minutes);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = scan_once(&scheduler, &cache, ctx).await {
                    error!("Scan failed: {:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping periodic scan");
                break;
            }
        }
    }
    Ok(())
}

async fn scan_once(
    scheduler: &Scheduler,
    cache: &DomainSelectorCache,
    ctx: &Context,
) -> Result<()> {
    let report = scheduler.run_stored_cycle().await?;
    ctx.save_cache(cache);
    print_report(&report, &ctx.format);
    Ok(())
}
