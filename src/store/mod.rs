//! Durable record of processed entries and per-feed check times.
//!
//! The whole state lives in one JSON document that is rewritten on every
//! save. There is no locking: exactly one process, and within it exactly one
//! cycle driver, may own a given state file.

mod file;
mod timestamp;
mod types;

pub use file::SeenStore;
pub use timestamp::Timestamp;
pub use types::{SeenRecord, StoreData, StoreError};
