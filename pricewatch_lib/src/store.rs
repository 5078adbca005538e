//! Tracker persistence.
//!
//! [`TrackerStore`] is the port the scheduler and the CLI use. The JSON
//! store treats the file as the source of truth: every listing and every
//! change starts from what is on disk, so a long-running scan and a
//! concurrent `add`/`remove` do not overwrite each other. The memory store
//! backs tests and one-off runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::types::{Owner, Tracker, TrackerKey};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed tracker file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("{owner} already has the maximum of {limit} trackers")]
    LimitReached { owner: Owner, limit: usize },
    #[error("no tracker {0}")]
    NotFound(TrackerKey),
}

/// Input for a new tracker; id and uuid are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewTracker {
    pub name: String,
    pub url: String,
    pub selectors: Vec<String>,
    pub render_required: bool,
    pub auto_detect: bool,
    pub current_price: Option<String>,
}

pub trait TrackerStore: Send + Sync {
    /// Every tracker of every owner.
    fn list_all(&self) -> Result<Vec<Tracker>, StoreError>;

    fn list(&self, owner: &Owner) -> Result<Vec<Tracker>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|t| &t.owner == owner)
            .collect())
    }

    fn add(&self, owner: &Owner, new: NewTracker) -> Result<Tracker, StoreError>;

    fn remove(&self, key: &TrackerKey) -> Result<Tracker, StoreError>;

    /// Stores a freshly scraped price and the selector that found it.
    fn record_price(&self, key: &TrackerKey, price: &str, selector: &str)
        -> Result<(), StoreError>;
}

fn add_to(trackers: &mut Vec<Tracker>, owner: &Owner, new: NewTracker) -> Result<Tracker, StoreError> {
    let owned = trackers.iter().filter(|t| &t.owner == owner);
    let limit = owner.tracker_limit();
    if owned.clone().count() >= limit {
        return Err(StoreError::LimitReached {
            owner: owner.clone(),
            limit,
        });
    }
    let id = owned.map(|t| t.id).max().unwrap_or(0) + 1;
    let auto_detect = new.auto_detect || new.selectors.is_empty();
    let tracker = Tracker {
        id,
        uuid: uuid::Uuid::new_v4().to_string(),
        owner: owner.clone(),
        name: new.name,
        url: new.url,
        active_selector: new.selectors.first().cloned(),
        selectors: new.selectors,
        render_required: new.render_required,
        auto_detect,
        current_price: new.current_price,
    };
    trackers.push(tracker.clone());
    Ok(tracker)
}

fn remove_from(trackers: &mut Vec<Tracker>, key: &TrackerKey) -> Result<Tracker, StoreError> {
    let pos = trackers
        .iter()
        .position(|t| t.owner == key.owner && t.id == key.id)
        .ok_or_else(|| StoreError::NotFound(key.clone()))?;
    Ok(trackers.remove(pos))
}

fn record_in(
    trackers: &mut [Tracker],
    key: &TrackerKey,
    price: &str,
    selector: &str,
) -> Result<(), StoreError> {
    let tracker = trackers
        .iter_mut()
        .find(|t| t.owner == key.owner && t.id == key.id)
        .ok_or_else(|| StoreError::NotFound(key.clone()))?;
    tracker.current_price = Some(price.to_string());
    tracker.active_selector = Some(selector.to_string());
    if !tracker.selectors.iter().any(|s| s == selector) {
        tracker.selectors.push(selector.to_string());
    }
    Ok(())
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryTrackerStore {
    trackers: Mutex<Vec<Tracker>>,
}

impl MemoryTrackerStore {
    pub fn new(trackers: Vec<Tracker>) -> Self {
        Self {
            trackers: Mutex::new(trackers),
        }
    }

    pub fn get(&self, key: &TrackerKey) -> Option<Tracker> {
        let trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        trackers
            .iter()
            .find(|t| t.owner == key.owner && t.id == key.id)
            .cloned()
    }
}

impl TrackerStore for MemoryTrackerStore {
    fn list_all(&self) -> Result<Vec<Tracker>, StoreError> {
        Ok(self.trackers.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn add(&self, owner: &Owner, new: NewTracker) -> Result<Tracker, StoreError> {
        add_to(&mut self.trackers.lock().unwrap_or_else(|e| e.into_inner()), owner, new)
    }

    fn remove(&self, key: &TrackerKey) -> Result<Tracker, StoreError> {
        remove_from(&mut self.trackers.lock().unwrap_or_else(|e| e.into_inner()), key)
    }

    fn record_price(&self, key: &TrackerKey, price: &str, selector: &str) -> Result<(), StoreError> {
        record_in(
            &mut self.trackers.lock().unwrap_or_else(|e| e.into_inner()),
            key,
            price,
            selector,
        )
    }
}

/// On-disk document: trackers grouped by global scope and by user.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    global: BTreeMap<String, Vec<StoredTracker>>,
    #[serde(default)]
    users: BTreeMap<String, Vec<StoredTracker>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTracker {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    uuid: String,
    name: String,
    url: String,
    #[serde(default)]
    selectors: Vec<String>,
    /// Single-selector field of older files.
    #[serde(default, skip_serializing)]
    selector: Option<String>,
    #[serde(default)]
    active_selector: Option<String>,
    #[serde(default, alias = "js")]
    render_required: bool,
    #[serde(default)]
    auto_detect: bool,
    #[serde(default, deserialize_with = "price_text")]
    current_price: Option<String>,
}

/// Older files stored prices as numbers.
fn price_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl StoredTracker {
    fn into_tracker(self, owner: Owner) -> Tracker {
        let mut selectors = self.selectors;
        if let Some(legacy) = self.selector.filter(|s| !s.trim().is_empty()) {
            if !selectors.contains(&legacy) {
                selectors.insert(0, legacy);
            }
        }
        Tracker {
            id: self.id,
            uuid: self.uuid,
            owner,
            name: self.name,
            url: self.url,
            auto_detect: self.auto_detect || selectors.is_empty(),
            selectors,
            active_selector: self.active_selector,
            render_required: self.render_required,
            current_price: self.current_price,
        }
    }

    fn from_tracker(t: &Tracker) -> Self {
        Self {
            id: t.id,
            uuid: t.uuid.clone(),
            name: t.name.clone(),
            url: t.url.clone(),
            selectors: t.selectors.clone(),
            selector: None,
            active_selector: t.active_selector.clone(),
            render_required: t.render_required,
            auto_detect: t.auto_detect,
            current_price: t.current_price.clone(),
        }
    }
}

impl StoreDocument {
    fn into_trackers(self) -> Vec<Tracker> {
        let global = self.global.into_iter().flat_map(|(scope, list)| {
            list.into_iter()
                .map(move |s| s.into_tracker(Owner::global(scope.clone())))
        });
        let users = self.users.into_iter().flat_map(|(user, list)| {
            list.into_iter()
                .map(move |s| s.into_tracker(Owner::user(user.clone())))
        });
        let mut trackers: Vec<Tracker> = global.chain(users).collect();
        repair_identity(&mut trackers);
        trackers
    }

    fn from_trackers(trackers: &[Tracker]) -> Self {
        let mut doc = Self::default();
        for t in trackers {
            let group = match &t.owner {
                Owner::Global { scope } => doc.global.entry(scope.clone()).or_default(),
                Owner::User { user } => doc.users.entry(user.clone()).or_default(),
            };
            group.push(StoredTracker::from_tracker(t));
        }
        doc
    }
}

/// Gives ids and uuids to records that lack them.
fn repair_identity(trackers: &mut [Tracker]) {
    let mut next_ids: BTreeMap<Owner, u32> = BTreeMap::new();
    for t in trackers.iter() {
        let next = next_ids.entry(t.owner.clone()).or_insert(1);
        *next = (*next).max(t.id + 1);
    }
    for t in trackers.iter_mut() {
        if t.id == 0 {
            let next = next_ids.entry(t.owner.clone()).or_insert(1);
            t.id = *next;
            *next += 1;
            debug!("Assigned id {} to tracker '{}'", t.id, t.name);
        }
        if t.uuid.is_empty() {
            t.uuid = uuid::Uuid::new_v4().to_string();
        }
    }
}

/// Flat JSON file store with write-through persistence.
#[derive(Debug)]
pub struct JsonTrackerStore {
    path: PathBuf,
    trackers: Mutex<Vec<Tracker>>,
}

impl JsonTrackerStore {
    /// Opens `path`; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let trackers = read_trackers(&path)?.unwrap_or_else(|| {
            warn!("No tracker file at {}, starting empty", path.display());
            Vec::new()
        });
        Ok(Self {
            path,
            trackers: Mutex::new(trackers),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, trackers: &[Tracker]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&StoreDocument::from_trackers(trackers))?;
        let write_err = |source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)
    }

    /// Re-reads the file, applies `change` and writes it back. The
    /// in-memory copy is only replaced once the write succeeded.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Vec<Tracker>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = read_trackers(&self.path)?.unwrap_or_default();
        let out = change(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }
}

/// Reads a tracker document; `None` when the file does not exist.
fn read_trackers(path: &Path) -> Result<Option<Vec<Tracker>>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(json) => Ok(Some(
            serde_json::from_str::<StoreDocument>(&json)?.into_trackers(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}

impl TrackerStore for JsonTrackerStore {
    fn list_all(&self) -> Result<Vec<Tracker>, StoreError> {
        let mut guard = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        *guard = read_trackers(&self.path)?.unwrap_or_default();
        Ok(guard.clone())
    }

    fn add(&self, owner: &Owner, new: NewTracker) -> Result<Tracker, StoreError> {
        self.mutate(|trackers| add_to(trackers, owner, new))
    }

    fn remove(&self, key: &TrackerKey) -> Result<Tracker, StoreError> {
        self.mutate(|trackers| remove_from(trackers, key))
    }

    fn record_price(&self, key: &TrackerKey, price: &str, selector: &str) -> Result<(), StoreError> {
        self.mutate(|trackers| record_in(trackers, key, price, selector))
    }
}
