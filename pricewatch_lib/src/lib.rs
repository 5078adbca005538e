//! Price detection and scrape scheduling for pricewatch.
//!
//! Finds the live price on arbitrary product pages, remembers which
//! selectors work per domain, and runs bounded-concurrency scrape cycles
//! over a tracker set.

pub mod cache;
pub mod config;
pub mod detect;
pub mod dom;
pub mod error;
pub mod normalize;
pub mod notify;
pub mod probe;
pub mod resolver;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod validation;

pub use pricewatch_fetch;
pub use pricewatch_fetch::{FetchOptions, FetchRequest, Fetcher, PageBody, PageFetcher};

pub use cache::{CacheError, DomainSelectorCache};
pub use config::ScrapeConfig;
pub use detect::{best_candidate, detect_price, Candidate, ScoredCandidate};
pub use dom::Document;
pub use error::PricewatchError;
pub use normalize::{clean_price_text, extract_price, prices_equal};
pub use notify::{format_change, LogNotifier, Notifier, NotifyError, RecordingNotifier};
pub use probe::probe_render_required;
pub use resolver::{Resolution, ResolveMode, ResolveSource, SelectorResolver};
pub use scheduler::{CycleReport, ScrapeState, Scheduler, TrackerOutcome};
pub use store::{JsonTrackerStore, MemoryTrackerStore, NewTracker, StoreError, TrackerStore};
pub use types::{ChangeRecord, DomainSelectorEntry, Owner, Tracker, TrackerKey};
pub use validation::{domain_of, validate_tracker_url, ValidationError};
