//! Page fetching for pricewatch: plain HTTP and headless-browser rendering
//! behind a single asynchronous [`Fetcher`] trait.

mod client;
mod errors;
mod fetcher;
mod render;
pub mod user_agent;

pub use self::client::HttpFetcher;
pub use self::errors::Error;
pub use self::fetcher::{FetchOptions, FetchRequest, Fetcher, PageBody, PageFetcher};
pub use self::render::RenderFetcher;
