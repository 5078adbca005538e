use anyhow::Result;
use clap::Args;
use pricewatch_lib::probe_render_required;
use pricewatch_lib::validation::{check_url_shape, validate_selector};

use super::Context;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct ProbeArgs {
    /// Page to check
    pub url: String,

    /// CSS selector of the price element
    pub selector: String,
}

pub async fn run(args: &ProbeArgs, ctx: &Context) -> Result<()> {
    check_url_shape(&args.url)?;
    let selector = validate_selector(&args.selector)?;
    let fetcher = ctx.fetcher()?;

    let required = probe_render_required(fetcher.as_ref(), &args.url, &selector).await;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "url": args.url,
            "selector": selector,
            "render_required": required,
        })),
        _ => match required {
            Some(true) => println!("Rendering is required for '{}'.", selector),
            Some(false) => println!("Rendering is NOT required for '{}'.", selector),
            None => println!("Could not determine whether '{}' needs rendering.", selector),
        },
    }
    Ok(())
}
