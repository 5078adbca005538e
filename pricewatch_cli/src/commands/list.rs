use anyhow::Result;
use clap::Args;
use pricewatch_lib::{JsonTrackerStore, TrackerStore};

use super::{Context, OwnerArgs};
use crate::output::print_trackers;

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub owner: OwnerArgs,

    /// List trackers of every owner
    #[arg(long)]
    pub all: bool,
}

pub fn run(args: &ListArgs, ctx: &Context) -> Result<()> {
    let store = JsonTrackerStore::open(&ctx.data)?;
    let trackers = if args.all {
        store.list_all()?
    } else {
        store.list(&args.owner.owner())?
    };
    print_trackers(&trackers, &ctx.format);
    Ok(())
}
