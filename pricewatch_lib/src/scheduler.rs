//! Scrape cycles over a set of trackers.
//!
//! A cycle runs in rounds. Round 0 dispatches every tracker at once; each
//! later round re-runs only the trackers that produced no price, after a
//! fixed delay. Render-backed and HTTP-only trackers draw permits from
//! separate pools. Diffing, store updates and notifications happen after
//! the last round, one tracker at a time.
//!
//! Uses Semaphore + JoinSet + mpsc: a task that panics never sends, so its
//! tracker simply counts as a miss for that round.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::ScrapeConfig;
use crate::error::PricewatchError;
use crate::normalize::prices_equal;
use crate::notify::Notifier;
use crate::resolver::{Resolution, SelectorResolver};
use crate::store::{StoreError, TrackerStore};
use crate::types::{ChangeRecord, DomainSelectorEntry, Tracker, TrackerKey};

/// Where a tracker stands within the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeState {
    Pending,
    Fetching,
    /// Missed and waiting for the next round.
    Retrying,
    Extracted,
    /// Missed in every round.
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerOutcome {
    pub tracker: TrackerKey,
    pub name: String,
    pub state: ScrapeState,
    pub attempts: usize,
    pub resolution: Option<Resolution>,
}

/// Everything one cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub changes: Vec<ChangeRecord>,
    pub outcomes: Vec<TrackerOutcome>,
    /// Domain entries first cached during this cycle.
    pub discovered: Vec<DomainSelectorEntry>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == ScrapeState::Failed)
            .count()
    }
}

struct RoundResult {
    index: usize,
    resolution: Option<Resolution>,
}

pub struct Scheduler {
    resolver: SelectorResolver,
    store: Arc<dyn TrackerStore>,
    notifier: Arc<dyn Notifier>,
    config: ScrapeConfig,
    render_pool: Arc<Semaphore>,
    light_pool: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(
        resolver: SelectorResolver,
        store: Arc<dyn TrackerStore>,
        notifier: Arc<dyn Notifier>,
        config: ScrapeConfig,
    ) -> Self {
        Self {
            render_pool: Arc::new(Semaphore::new(config.render_concurrency.max(1))),
            light_pool: Arc::new(Semaphore::new(config.light_concurrency.max(1))),
            resolver,
            store,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Runs a cycle over every tracker in the store.
    pub async fn run_stored_cycle(&self) -> Result<CycleReport, PricewatchError> {
        let trackers = self.store.list_all()?;
        Ok(self.run_cycle(trackers).await)
    }

    /// Scrapes `trackers`, applies the results and reports what changed.
    pub async fn run_cycle(&self, trackers: Vec<Tracker>) -> CycleReport {
        let started_at = Utc::now();
        let known_domains: HashSet<String> = self
            .resolver
            .cache()
            .entries()
            .into_iter()
            .map(|e| e.domain)
            .collect();

        let mut states = vec![ScrapeState::Pending; trackers.len()];
        let mut attempts = vec![0usize; trackers.len()];
        let mut results: Vec<Option<Resolution>> = vec![None; trackers.len()];
        let mut pending: Vec<usize> = (0..trackers.len()).collect();

        for round in 0..=self.config.retries {
            if pending.is_empty() {
                break;
            }
            if round > 0 {
                info!(
                    "Retrying {} tracker(s) in {:?} (round {})",
                    pending.len(),
                    self.config.retry_delay,
                    round
                );
                tokio::time::sleep(self.config.retry_delay).await;
            }

            for &i in &pending {
                states[i] = ScrapeState::Fetching;
                attempts[i] += 1;
            }
            let mut found = self.run_round(&trackers, &pending).await;

            let last_round = round == self.config.retries;
            let mut missed = Vec::new();
            for i in pending {
                match found.remove(&i) {
                    Some(resolution) => {
                        states[i] = ScrapeState::Extracted;
                        results[i] = Some(resolution);
                    }
                    None if last_round => states[i] = ScrapeState::Failed,
                    None => {
                        states[i] = ScrapeState::Retrying;
                        missed.push(i);
                    }
                }
            }
            pending = missed;
        }

        let checked_at = Utc::now();
        let mut changes = Vec::new();
        let mut outcomes = Vec::with_capacity(trackers.len());
        for (i, tracker) in trackers.iter().enumerate() {
            let resolution = results[i].take();
            match self.apply(tracker, resolution.as_ref(), checked_at).await {
                Ok(Some(change)) => changes.push(change),
                Ok(None) => {}
                Err(e) => {
                    error!("Could not store price for {}: {}", tracker.key(), e);
                    states[i] = ScrapeState::Failed;
                }
            }
            outcomes.push(TrackerOutcome {
                tracker: tracker.key(),
                name: tracker.name.clone(),
                state: states[i],
                attempts: attempts[i],
                resolution,
            });
        }

        let discovered: Vec<DomainSelectorEntry> = self
            .resolver
            .cache()
            .entries()
            .into_iter()
            .filter(|e| !known_domains.contains(&e.domain))
            .collect();

        let report = CycleReport {
            changes,
            outcomes,
            discovered,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "Scrape cycle done: {} tracker(s), {} change(s), {} failed, {} new domain(s)",
            trackers.len(),
            report.changes.len(),
            report.failed(),
            report.discovered.len()
        );
        report
    }

    /// Resolves the trackers at `indices` concurrently and returns the hits.
    async fn run_round(&self, trackers: &[Tracker], indices: &[usize]) -> HashMap<usize, Resolution> {
        let (tx, mut rx) = mpsc::channel::<RoundResult>(indices.len().max(1));
        let mut join_set = JoinSet::new();

        for &index in indices {
            let tracker = trackers[index].clone();
            let resolver = self.resolver.clone();
            let sender = tx.clone();
            let pool = if tracker.render_required {
                Arc::clone(&self.render_pool)
            } else {
                Arc::clone(&self.light_pool)
            };

            join_set.spawn(async move {
                let Ok(_permit) = pool.acquire_owned().await else {
                    return;
                };
                debug!("Scraping tracker {} ({})", tracker.key(), tracker.url);
                let resolution = resolver.resolve(&tracker).await;
                let _ = sender.send(RoundResult { index, resolution }).await;
            });
        }
        drop(tx);

        let mut found = HashMap::new();
        while let Some(result) = rx.recv().await {
            if let Some(resolution) = result.resolution {
                found.insert(result.index, resolution);
            }
        }
        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                error!("Scrape task failed: {}", e);
            }
        }
        found
    }

    /// Diffs one result against the stored baseline and pushes it to the
    /// store and the notifier. Nothing is notified when the store write
    /// fails, so the baseline and the reported price never disagree.
    async fn apply(
        &self,
        tracker: &Tracker,
        resolution: Option<&Resolution>,
        checked_at: DateTime<Utc>,
    ) -> Result<Option<ChangeRecord>, StoreError> {
        let key = tracker.key();
        let Some(hit) = resolution else {
            warn!("No price for tracker {} '{}' after retries", key, tracker.name);
            if let Err(e) = self.notifier.selector_broken(tracker, &tracker.owner).await {
                error!("Broken-selector notification for {} failed: {}", key, e);
            }
            return Ok(Some(ChangeRecord {
                tracker: key,
                name: tracker.name.clone(),
                url: tracker.url.clone(),
                old_price: tracker.current_price.clone(),
                new_price: None,
                checked_at,
            }));
        };

        self.store.record_price(&key, &hit.price, &hit.selector)?;

        let unchanged = tracker
            .current_price
            .as_deref()
            .is_some_and(|old| prices_equal(old, &hit.price));
        if unchanged {
            return Ok(None);
        }

        let change = ChangeRecord {
            tracker: key,
            name: tracker.name.clone(),
            url: tracker.url.clone(),
            old_price: tracker.current_price.clone(),
            new_price: Some(hit.price.clone()),
            checked_at,
        };
        if let Err(e) = self.notifier.price_changed(&change).await {
            error!("Change notification for {} failed: {}", change.tracker, e);
        }
        Ok(Some(change))
    }
}
