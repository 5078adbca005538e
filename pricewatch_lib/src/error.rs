//! Error types for the library layer.

use std::fmt;

use crate::store::StoreError;
use crate::validation::ValidationError;

/// Errors surfaced to callers of the library, wrapping fetch, store and
/// serialization failures plus configuration and input problems.
#[derive(Debug)]
pub enum PricewatchError {
    /// An error from the page fetcher.
    Fetch(pricewatch_fetch::Error),
    /// The tracker store rejected or failed an operation.
    Store(StoreError),
    /// A tracker URL failed validation.
    Validation(ValidationError),
    /// JSON serialization or deserialization failed.
    Serialization(serde_json::Error),
    /// A configuration file could not be read or parsed.
    Config(String),
    /// User-provided input failed validation.
    InvalidInput(String),
}

impl fmt::Display for PricewatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "Fetch error: {}", e),
            Self::Store(e) => write!(f, "Store error: {}", e),
            Self::Validation(e) => write!(f, "Invalid URL: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Config(msg) => write!(f, "Config error: {}", msg),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for PricewatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Validation(e) => Some(e),
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<pricewatch_fetch::Error> for PricewatchError {
    fn from(e: pricewatch_fetch::Error) -> Self {
        Self::Fetch(e)
    }
}

impl From<StoreError> for PricewatchError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<ValidationError> for PricewatchError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<serde_json::Error> for PricewatchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}
