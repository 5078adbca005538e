//! Decides whether a selector needs a rendered page.

use pricewatch_fetch::{FetchRequest, Fetcher, PageBody};
use tracing::{debug, info, warn};

use crate::resolver::{fragment_text, select_text};

/// Tries `selector` on a plain fetch, then on a rendered one.
///
/// `Some(false)` when the plain page already has text under the selector,
/// `Some(true)` when only the rendered page does, `None` when neither does.
pub async fn probe_render_required(fetcher: &dyn Fetcher, url: &str, selector: &str) -> Option<bool> {
    match fetcher.fetch(FetchRequest::light(url)).await {
        Ok(body) => {
            if let Some(text) = select_text(body.markup(), selector) {
                info!("Selector '{}' found '{}' without rendering", selector, text);
                return Some(false);
            }
        }
        Err(e) => warn!("Plain fetch of {} failed: {}", url, e),
    }

    let text = match fetcher.fetch(FetchRequest::rendered(url, Some(selector))).await {
        Ok(PageBody::Fragment(markup)) => fragment_text(&markup),
        Ok(PageBody::Document(markup)) => select_text(&markup, selector),
        Err(e) => {
            warn!("Rendered fetch of {} failed: {}", url, e);
            return None;
        }
    };
    match text {
        Some(text) => {
            info!("Selector '{}' found '{}' after rendering", selector, text);
            Some(true)
        }
        None => {
            debug!("Selector '{}' matched nothing on {}, even rendered", selector, url);
            None
        }
    }
}
