use anyhow::Result;
use clap::Args;
use pricewatch_lib::{JsonTrackerStore, TrackerKey, TrackerStore};
use tracing::info;

use super::{Context, OwnerArgs};
use crate::output::print_trackers;

#[derive(Args)]
pub struct RemoveArgs {
    /// Tracker id within its owner's list
    pub id: u32,

    #[command(flatten)]
    pub owner: OwnerArgs,
}

pub fn run(args: &RemoveArgs, ctx: &Context) -> Result<()> {
    let store = JsonTrackerStore::open(&ctx.data)?;
    let key = TrackerKey {
        owner: args.owner.owner(),
        id: args.id,
    };
    let removed = store.remove(&key)?;
    info!("Removed tracker {} '{}'", key, removed.name);
    print_trackers(&[removed], &ctx.format);
    Ok(())
}
