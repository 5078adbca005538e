use anyhow::Result;
use clap::Args;
use pricewatch_lib::validation::{validate_name, validate_selector};
use pricewatch_lib::{
    probe_render_required, validate_tracker_url, JsonTrackerStore, NewTracker, SelectorResolver,
    Tracker, TrackerStore,
};
use tracing::{info, warn};

use super::{Context, OwnerArgs};
use crate::output::print_trackers;

#[derive(Args)]
pub struct AddArgs {
    /// Display name
    pub name: String,

    /// Product page URL (http or https, public hosts only)
    pub url: String,

    /// CSS selector of the price; repeat for fallbacks. Omit to auto-detect
    #[arg(long)]
    pub selector: Vec<String>,

    /// Always render the page in a headless browser
    #[arg(long)]
    pub render: bool,

    /// Skip the render-requirement probe
    #[arg(long)]
    pub no_probe: bool,

    #[command(flatten)]
    pub owner: OwnerArgs,
}

pub async fn run(args: &AddArgs, ctx: &Context) -> Result<()> {
    let url = validate_tracker_url(&args.url).await?.to_string();
    let name = validate_name(&args.name)?;
    let selectors = args
        .selector
        .iter()
        .map(|s| validate_selector(s))
        .collect::<Result<Vec<_>, _>>()?;
    let owner = args.owner.owner();

    let store = JsonTrackerStore::open(&ctx.data)?;
    let fetcher = ctx.fetcher()?;

    let render_required = match selectors.first() {
        _ if args.render => true,
        Some(first) if !args.no_probe => {
            match probe_render_required(fetcher.as_ref(), &url, first).await {
                Some(required) => required,
                None => {
                    warn!("Could not tell whether '{}' needs rendering; assuming it does", first);
                    true
                }
            }
        }
        // Nothing to probe with; the baseline resolve below decides.
        _ => false,
    };

    // Resolve once so the tracker starts with a baseline price.
    let cache = ctx.load_cache();
    let resolver = SelectorResolver::new(fetcher, cache.clone());
    let draft = Tracker {
        id: 0,
        uuid: String::new(),
        owner: owner.clone(),
        name: name.clone(),
        url: url.clone(),
        active_selector: selectors.first().cloned(),
        selectors: selectors.clone(),
        render_required,
        auto_detect: selectors.is_empty(),
        current_price: None,
    };
    let found = resolver.resolve(&draft).await;
    ctx.save_cache(&cache);

    let mut new = NewTracker {
        name,
        url,
        selectors,
        render_required,
        auto_detect: draft.auto_detect,
        current_price: None,
    };
    match &found {
        Some(hit) => {
            info!("Current price {} via '{}'", hit.price, hit.selector);
            if new.selectors.is_empty() {
                new.selectors.push(hit.selector.clone());
                new.render_required = hit.render_required;
            }
            new.current_price = Some(hit.price.clone());
        }
        None => warn!("No price found yet for {}", draft.url),
    }

    let tracker = store.add(&owner, new)?;
    print_trackers(&[tracker], &ctx.format);
    Ok(())
}
