use anyhow::{bail, Result};
use clap::Args;
use pricewatch_lib::detect::{detect_price, score, CandidateView};
use pricewatch_lib::validation::check_url_shape;
use pricewatch_lib::{Document, FetchRequest, Fetcher};

use super::Context;
use crate::output::{print_candidates, OutputFormat};

#[derive(Args)]
pub struct DetectArgs {
    /// Page to inspect
    pub url: String,

    /// Render the page in a headless browser first
    #[arg(long)]
    pub render: bool,

    /// Number of candidates to show
    #[arg(long, default_value = "5")]
    pub top: usize,

    /// Show which scoring rules fired for the best candidate
    #[arg(long)]
    pub explain: bool,
}

pub async fn run(args: &DetectArgs, ctx: &Context) -> Result<()> {
    check_url_shape(&args.url)?;
    let fetcher = ctx.fetcher()?;
    let body = fetcher
        .fetch(FetchRequest::new(&args.url, args.render, None))
        .await?;

    let doc = Document::parse(body.markup());
    let ranked = detect_price(&doc);
    if ranked.is_empty() {
        bail!("no price-like text found on {}", args.url);
    }
    let shown = &ranked[..ranked.len().min(args.top.max(1))];
    print_candidates(shown, &ctx.format);

    if args.explain && !matches!(ctx.format, OutputFormat::Json) {
        let best = &ranked[0];
        if let Some(element) = doc.element(best.candidate.node) {
            let view = CandidateView {
                element,
                selector: &best.candidate.selector,
                text: &best.candidate.text,
                font_size: best.candidate.font_size,
            };
            println!("Rules for '{}':", best.candidate.selector);
            for (rule, weight) in score::explain(&view) {
                println!("  {:+4}  {}", weight, rule);
            }
        }
    }
    Ok(())
}
