//! Turns a tracker into a price: known selectors first, heuristics last.

use std::sync::Arc;

use pricewatch_fetch::{FetchRequest, Fetcher, PageBody};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::DomainSelectorCache;
use crate::detect::{best_candidate, crosses_out};
use crate::dom::{convert_element, Document};
use crate::normalize::extract_price;
use crate::types::{DomainSelectorEntry, Tracker};

/// Where the working selector came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveSource {
    /// The shared per-domain cache.
    Domain,
    /// The tracker's own selector list.
    Tracker,
    /// Found by scoring candidates on the page.
    Heuristic,
}

/// A price found on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Cleaned price string.
    pub price: String,
    pub selector: String,
    pub render_required: bool,
    pub source: ResolveSource,
}

/// Search order for a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Domain cache, then own selectors, then heuristic detection on the
    /// static page and, failing that, on the rendered page.
    AutoDetect,
    /// Own selectors (active first), then domain cache. Never guesses.
    Tracked,
}

impl ResolveMode {
    pub fn for_tracker(tracker: &Tracker) -> Self {
        if tracker.auto_detect || tracker.selectors.is_empty() {
            Self::AutoDetect
        } else {
            Self::Tracked
        }
    }
}

struct Attempt<'a> {
    selector: &'a str,
    render: bool,
    source: ResolveSource,
}

/// Outcome of fetching one page variant during a resolve.
enum Fetched {
    Page(String),
    Failed,
}

/// Pages already fetched while resolving one tracker, per render mode.
/// A rendered page is only kept when the render returned the whole
/// document; fragments belong to a single selector.
#[derive(Default)]
struct PageMemo {
    light: Option<Fetched>,
    rendered: Option<Fetched>,
}

/// Resolves trackers against the page fetcher and the domain cache.
#[derive(Clone)]
pub struct SelectorResolver {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<DomainSelectorCache>,
}

impl SelectorResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<DomainSelectorCache>) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &Arc<DomainSelectorCache> {
        &self.cache
    }

    /// Resolves using the mode the tracker asks for.
    pub async fn resolve(&self, tracker: &Tracker) -> Option<Resolution> {
        self.resolve_with_mode(tracker, ResolveMode::for_tracker(tracker))
            .await
    }

    /// Returns the first non-empty price, or `None`. Never invents a value.
    ///
    /// A hit from anywhere but the domain cache offers its selector to the
    /// cache for the tracker's domain; an existing entry is left alone.
    pub async fn resolve_with_mode(
        &self,
        tracker: &Tracker,
        mode: ResolveMode,
    ) -> Option<Resolution> {
        let domain = tracker.domain();
        let cached = domain.as_deref().and_then(|d| self.cache.get(d));

        let domain_attempts = cached.iter().flat_map(|entry| {
            entry.selectors.iter().map(move |s| Attempt {
                selector: s,
                render: entry.render_required,
                source: ResolveSource::Domain,
            })
        });
        let own_attempts = tracker.ordered_selectors().into_iter().map(|s| Attempt {
            selector: s,
            render: tracker.render_required,
            source: ResolveSource::Tracker,
        });
        let attempts: Vec<Attempt<'_>> = match mode {
            ResolveMode::AutoDetect => domain_attempts.chain(own_attempts).collect(),
            ResolveMode::Tracked => own_attempts.chain(domain_attempts).collect(),
        };

        let mut memo = PageMemo::default();
        let mut found = None;
        for attempt in &attempts {
            if let Some(price) = self
                .try_selector(&tracker.url, attempt.selector, attempt.render, &mut memo)
                .await
            {
                found = Some(Resolution {
                    price,
                    selector: attempt.selector.to_string(),
                    render_required: attempt.render,
                    source: attempt.source,
                });
                break;
            }
        }

        if found.is_none() && mode == ResolveMode::AutoDetect {
            found = self
                .detect(&tracker.url, tracker.render_required, &mut memo)
                .await;
            if found.is_none() && !tracker.render_required {
                debug!("Nothing on the static page of {}, rendering", tracker.url);
                found = self.detect(&tracker.url, true, &mut memo).await;
            }
        }

        match (&found, domain) {
            (Some(hit), Some(domain)) if hit.source != ResolveSource::Domain => {
                let stored = self.cache.insert_if_absent(DomainSelectorEntry {
                    domain: domain.clone(),
                    selectors: vec![hit.selector.clone()],
                    render_required: hit.render_required,
                });
                if stored {
                    info!("Discovered selector '{}' for {}", hit.selector, domain);
                }
            }
            (None, _) => debug!("No price found for {}", tracker.url),
            _ => {}
        }
        found
    }

    async fn try_selector(
        &self,
        url: &str,
        selector: &str,
        render: bool,
        memo: &mut PageMemo,
    ) -> Option<String> {
        debug!("Trying selector '{}' on {} (render: {})", selector, url, render);

        let slot = if render {
            &mut memo.rendered
        } else {
            &mut memo.light
        };
        match slot {
            Some(Fetched::Page(markup)) => return select_price(markup, selector),
            Some(Fetched::Failed) => return None,
            None => {}
        }

        let wait_for = render.then_some(selector);
        match self.fetcher.fetch(FetchRequest::new(url, render, wait_for)).await {
            Ok(PageBody::Fragment(markup)) => fragment_price(&markup),
            Ok(PageBody::Document(markup)) => {
                let price = select_price(&markup, selector);
                *slot = Some(Fetched::Page(markup));
                price
            }
            Err(e) => {
                warn!("Fetching {} failed: {}", url, e);
                *slot = Some(Fetched::Failed);
                None
            }
        }
    }

    async fn detect(&self, url: &str, render: bool, memo: &mut PageMemo) -> Option<Resolution> {
        let slot = if render {
            &mut memo.rendered
        } else {
            &mut memo.light
        };
        let markup = match slot.take() {
            Some(Fetched::Page(markup)) => markup,
            Some(Fetched::Failed) => return None,
            None => match self.fetcher.fetch(FetchRequest::new(url, render, None)).await {
                Ok(body) => body.markup().to_string(),
                Err(e) => {
                    warn!("Fetching {} failed: {}", url, e);
                    return None;
                }
            },
        };

        let best = best_candidate(&Document::parse(&markup))?;
        let price = best.price()?;
        debug!(
            "Heuristic picked '{}' ({}) on {} with score {}",
            best.candidate.selector, price, url, best.score
        );
        Some(Resolution {
            price,
            selector: best.candidate.selector,
            render_required: render,
            source: ResolveSource::Heuristic,
        })
    }
}

/// Price inside the first element matching `selector`.
pub fn select_price(markup: &str, selector: &str) -> Option<String> {
    extract_price(&select_text(markup, selector)?)
}

/// Trimmed, non-empty text of the first element matching `selector`.
pub fn select_text(markup: &str, selector: &str) -> Option<String> {
    let parsed = match Selector::parse(selector) {
        Ok(s) => s,
        Err(e) => {
            debug!("Skipping unparsable selector '{}': {:?}", selector, e);
            return None;
        }
    };
    let html = Html::parse_document(markup);
    let element = html.select(&parsed).next()?;
    non_empty(live_text(element))
}

/// Trimmed, non-empty text of a serialized element.
pub fn fragment_text(markup: &str) -> Option<String> {
    let html = Html::parse_fragment(markup);
    non_empty(live_text(html.root_element()))
}

/// Text of `element`, leaving out crossed-out descendants.
fn live_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_live_text(element, &mut out);
    out
}

fn collect_live_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if !crosses_out(&convert_element(child_el.value())) {
                collect_live_text(child_el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn fragment_price(markup: &str) -> Option<String> {
    extract_price(&fragment_text(markup)?)
}
