//! RSS/Atom feed retrieval.
//!
//! - [`parser`] - converts raw feed bytes into [`FeedEntry`] records using `feed-rs`
//! - [`fetcher`] - HTTP retrieval with a timeout and response size limit
//!
//! The cycle driver only depends on the [`FeedSource`] trait, so tests can
//! substitute an in-memory source.

mod fetcher;
mod parser;

pub use fetcher::{FeedSource, FetchError, HttpFeedSource};
pub use parser::{parse_feed, FeedEntry};
