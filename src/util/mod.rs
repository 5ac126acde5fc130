//! Utility functions shared by the fetch, transform and publish stages.
//!
//! - **URL validation**: scheme checks for configured feed URLs and service base URLs
//! - **Text processing**: character-boundary-safe truncation and chunking
//!
//! # Examples
//!
//! ```
//! use feedcast::util::{truncate_chars, validate_feed_url};
//!
//! let url = validate_feed_url("https://example.com/feed.xml").unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//!
//! assert_eq!(truncate_chars("héllo world", 5), "héllo");
//! ```

mod text;
mod url_validator;

pub use text::{split_chunks, truncate_chars};
pub use url_validator::{require_secure_base, validate_feed_url, UrlValidationError};
