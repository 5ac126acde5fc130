//! feedcast polls RSS/Atom feeds, rewrites entries it has not seen before
//! with an LLM and posts the result to a Discord channel.
//!
//! - [`feed`] - fetching and parsing feeds
//! - [`store`] - the durable seen-set and per-feed check times
//! - [`content`] - rewriting and validating entries
//! - [`publish`] - delivering posts, split to the channel's size limit
//! - [`cycle`] - the per-feed throttle, dedup, cap and post pipeline
//! - [`scheduler`] - the timer loop that runs cycles
//! - [`config`] - file and environment configuration

pub mod config;
pub mod content;
pub mod cycle;
pub mod feed;
pub mod publish;
pub mod scheduler;
pub mod store;
pub mod util;
