//! Records shared by the resolver, scheduler, store and notifier.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::domain_of;

/// Who a tracker belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Owner {
    /// A shared scope, e.g. a server or team.
    Global { scope: String },
    /// A single user's private list.
    User { user: String },
}

impl Owner {
    pub fn global(scope: impl Into<String>) -> Self {
        Self::Global {
            scope: scope.into(),
        }
    }

    pub fn user(user: impl Into<String>) -> Self {
        Self::User { user: user.into() }
    }

    /// Maximum number of trackers this owner may hold.
    pub fn tracker_limit(&self) -> usize {
        match self {
            Self::Global { .. } => 20,
            Self::User { .. } => 5,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global { scope } => write!(f, "global:{}", scope),
            Self::User { user } => write!(f, "user:{}", user),
        }
    }
}

/// Identifies a tracker: ids are only unique within one owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackerKey {
    pub owner: Owner,
    pub id: u32,
}

impl fmt::Display for TrackerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner, self.id)
    }
}

/// A page whose price is watched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: u32,
    pub uuid: String,
    pub owner: Owner,
    pub name: String,
    pub url: String,
    /// Selectors in order of preference.
    pub selectors: Vec<String>,
    /// The selector that last produced a price.
    pub active_selector: Option<String>,
    pub render_required: bool,
    pub auto_detect: bool,
    /// Last known price, already cleaned.
    pub current_price: Option<String>,
}

impl Tracker {
    pub fn key(&self) -> TrackerKey {
        TrackerKey {
            owner: self.owner.clone(),
            id: self.id,
        }
    }

    /// Host of the tracked URL without a `www.` prefix.
    pub fn domain(&self) -> Option<String> {
        domain_of(&self.url)
    }

    /// Own selectors with the active one moved to the front.
    pub fn ordered_selectors(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.selectors.len() + 1);
        if let Some(active) = self.active_selector.as_deref().filter(|s| !s.is_empty()) {
            out.push(active);
        }
        for sel in &self.selectors {
            if !sel.is_empty() && !out.contains(&sel.as_str()) {
                out.push(sel);
            }
        }
        out
    }
}

/// Selectors known to work for a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSelectorEntry {
    pub domain: String,
    pub selectors: Vec<String>,
    pub render_required: bool,
}

/// A price change, or a price that could not be found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub tracker: TrackerKey,
    pub name: String,
    pub url: String,
    pub old_price: Option<String>,
    /// `None` means the price could not be found this cycle.
    pub new_price: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ChangeRecord {
    pub fn is_unavailable(&self) -> bool {
        self.new_price.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(selectors: &[&str], active: Option<&str>) -> Tracker {
        Tracker {
            id: 1,
            uuid: "u".into(),
            owner: Owner::user("ann"),
            name: "Lamp".into(),
            url: "https://www.shop.example/lamp".into(),
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            active_selector: active.map(str::to_string),
            render_required: false,
            auto_detect: false,
            current_price: None,
        }
    }

    #[test]
    fn active_selector_goes_first_without_duplicates() {
        let t = tracker(&["a", "b", "c"], Some("b"));
        assert_eq!(t.ordered_selectors(), vec!["b", "a", "c"]);
    }

    #[test]
    fn empty_selectors_are_skipped() {
        let t = tracker(&["", "a"], Some(""));
        assert_eq!(t.ordered_selectors(), vec!["a"]);
    }

    #[test]
    fn domain_strips_www() {
        assert_eq!(tracker(&[], None).domain().as_deref(), Some("shop.example"));
    }

    #[test]
    fn owner_limits_and_display() {
        assert_eq!(Owner::global("g").tracker_limit(), 20);
        assert_eq!(Owner::user("u").tracker_limit(), 5);
        let key = TrackerKey {
            owner: Owner::global("team"),
            id: 3,
        };
        assert_eq!(key.to_string(), "global:team#3");
    }
}
