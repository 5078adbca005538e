//! Domain → selector cache backed by `DashMap` for concurrent access.
//!
//! Read-mostly during a cycle. New domains are added with
//! [`DomainSelectorCache::insert_if_absent`], so when two trackers on the
//! same unseen domain discover selectors concurrently, exactly one entry
//! survives. Existing entries are never overwritten.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::DomainSelectorEntry;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
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
    #[error("malformed selector cache: {0}")]
    Format(#[from] serde_json::Error),
}

/// One domain as stored on disk. Older files hold a bare selector list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Legacy(Vec<String>),
    Full {
        #[serde(default)]
        selectors: Vec<String>,
        #[serde(rename = "js", default = "render_by_default")]
        render_required: bool,
    },
}

// Legacy entries predate the render flag and were always rendered.
fn render_by_default() -> bool {
    true
}

/// Thread-safe domain selector cache.
#[derive(Debug, Default)]
pub struct DomainSelectorCache {
    entries: DashMap<String, DomainSelectorEntry>,
    dirty: AtomicBool,
}

impl DomainSelectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = DomainSelectorEntry>) -> Self {
        let cache = Self::new();
        for entry in entries {
            cache.entries.insert(entry.domain.clone(), entry);
        }
        cache
    }

    /// Returns a copy of the entry for `domain`.
    pub fn get(&self, domain: &str) -> Option<DomainSelectorEntry> {
        self.entries.get(domain).map(|e| e.value().clone())
    }

    /// Stores `entry` unless its domain already has one. Returns whether
    /// it was stored.
    pub fn insert_if_absent(&self, entry: DomainSelectorEntry) -> bool {
        if entry.selectors.is_empty() {
            return false;
        }
        match self.entries.entry(entry.domain.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                debug!("Caching selectors for new domain {}", entry.domain);
                slot.insert(entry);
                self.dirty.store(true, Ordering::SeqCst);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries sorted by domain.
    pub fn entries(&self) -> Vec<DomainSelectorEntry> {
        let mut out: Vec<_> = self.entries.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.domain.cmp(&b.domain));
        out
    }

    /// Whether entries were added since load or the last save.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn from_json(json: &str) -> Result<Self, CacheError> {
        let raw: BTreeMap<String, StoredEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(raw.into_iter().map(|(domain, stored)| {
            let (selectors, render_required) = match stored {
                StoredEntry::Full {
                    selectors,
                    render_required,
                } => (selectors, render_required),
                StoredEntry::Legacy(selectors) => (selectors, render_by_default()),
            };
            DomainSelectorEntry {
                domain,
                selectors,
                render_required,
            }
        })))
    }

    pub fn to_json(&self) -> Result<String, CacheError> {
        let raw: BTreeMap<String, StoredEntry> = self
            .entries()
            .into_iter()
            .map(|e| {
                (
                    e.domain,
                    StoredEntry::Full {
                        selectors: e.selectors,
                        render_required: e.render_required,
                    },
                )
            })
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Reads the cache file. A missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(source) => Err(CacheError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Like [`load`](Self::load), but any failure yields an empty cache.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("Selector cache unavailable, starting empty: {}", e);
                Self::new()
            }
        }
    }

    /// Writes the cache through a temp file and clears the dirty flag.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let json = self.to_json()?;
        let write_err = |source| CacheError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, path).map_err(write_err)?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }
}
