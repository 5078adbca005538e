//! Notification port for price changes and broken selectors.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::types::{ChangeRecord, Owner, Tracker, TrackerKey};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
}

/// Receives the results of a scrape cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A tracker's price differs from its stored baseline.
    async fn price_changed(&self, change: &ChangeRecord) -> Result<(), NotifyError>;

    /// No price could be found for a tracker after all retries.
    async fn selector_broken(&self, tracker: &Tracker, owner: &Owner) -> Result<(), NotifyError>;
}

/// Human-readable message for a change record.
pub fn format_change(change: &ChangeRecord) -> String {
    let old = change.old_price.as_deref().unwrap_or("unknown");
    match &change.new_price {
        Some(new) => format!(
            "Your tracker '{}' changed price: OLD price: {} --> NEW price {}",
            change.name, old, new
        ),
        None => format!(
            "Your tracker '{}' could not find a price on {} (last known: {}). \
             The page may have changed and its selector may need attention.",
            change.name, change.url, old
        ),
    }
}

/// Message for a tracker whose selectors no longer match.
pub fn format_broken(tracker: &Tracker) -> String {
    format!(
        "Tracker #{} '{}' returned no price after retries; check its selector ({})",
        tracker.id,
        tracker.name,
        tracker
            .active_selector
            .as_deref()
            .or(tracker.selectors.first().map(String::as_str))
            .unwrap_or("auto-detect")
    )
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn price_changed(&self, change: &ChangeRecord) -> Result<(), NotifyError> {
        info!("[{}] {}", change.tracker.owner, format_change(change));
        Ok(())
    }

    async fn selector_broken(&self, tracker: &Tracker, owner: &Owner) -> Result<(), NotifyError> {
        warn!("[{}] {}", owner, format_broken(tracker));
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    changes: Mutex<Vec<ChangeRecord>>,
    broken: Mutex<Vec<TrackerKey>>,
}

impl RecordingNotifier {
    pub fn changes(&self) -> Vec<ChangeRecord> {
        self.changes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn broken(&self) -> Vec<TrackerKey> {
        self.broken.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn price_changed(&self, change: &ChangeRecord) -> Result<(), NotifyError> {
        self.changes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(change.clone());
        Ok(())
    }

    async fn selector_broken(&self, tracker: &Tracker, _owner: &Owner) -> Result<(), NotifyError> {
        self.broken
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tracker.key());
        Ok(())
    }
}
