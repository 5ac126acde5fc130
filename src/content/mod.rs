//! Rewriting feed entries into chat posts.
//!
//! The cycle driver talks to a [`ContentTransformer`]; [`AnthropicClient`]
//! is the production implementation. The helpers here cover the parts of
//! the contract the driver owns: the deterministic [`fallback_message`]
//! used when a rewrite fails, and [`looks_like_refusal`] for replies that
//! succeeded at the HTTP level but contain no usable post.

mod anthropic;

pub use anthropic::{AnthropicClient, DEFAULT_MODEL};

use crate::util::truncate_chars;
use async_trait::async_trait;
use thiserror::Error;

/// Characters of body text kept in the fallback message.
const FALLBACK_BODY_CHARS: usize = 500;

/// Reply fragments that mean the model declined or could not do the job.
const REFUSAL_MARKERS: &[&str] = &[
    "I apologize",
    "I cannot access",
    "I notice the provided",
    "future date",
    "cannot accurately transform",
    "without the actual article content",
    "I'm unable to",
    "I don't have access",
    "appears to be from a future",
    "I cannot provide",
];

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Malformed reply: {0}")]
    Malformed(String),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// Outcome of the optional suitability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// The service's reason, e.g. `SKIP_NO_CONTENT`.
    Invalid(String),
}

impl Verdict {
    /// Maps a raw validator reply: exactly `VALID` passes, anything else is
    /// treated as the skip reason.
    pub fn from_reply(reply: &str) -> Self {
        let reply = reply.trim();
        if reply == "VALID" {
            Verdict::Valid
        } else {
            Verdict::Invalid(reply.to_string())
        }
    }
}

#[async_trait]
pub trait ContentTransformer: Send + Sync {
    /// Rewrites an entry into a post.
    async fn transform(&self, title: &str, body: &str, link: &str)
        -> Result<String, TransformError>;

    /// Judges whether an entry is worth rewriting at all.
    async fn validate(&self, title: &str, body: &str, link: &str)
        -> Result<Verdict, TransformError>;
}

/// Plain formatting used when the transformer fails.
pub fn fallback_message(title: &str, body: &str, link: &str) -> String {
    format!(
        "🔥 **{}**\n\n{}...\n\n🔗 Read more: {}",
        title,
        truncate_chars(body, FALLBACK_BODY_CHARS),
        link
    )
}

/// True if `message` reads like an apology or refusal rather than a post.
pub fn looks_like_refusal(message: &str) -> bool {
    let lower = message.to_lowercase();
    REFUSAL_MARKERS
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_contains_title_truncated_body_and_link() {
        let body = "b".repeat(2000);
        let msg = fallback_message("Title", &body, "https://example.com/a");

        assert!(msg.contains("**Title**"));
        assert!(msg.contains(&"b".repeat(500)));
        assert!(!msg.contains(&"b".repeat(501)));
        assert!(msg.ends_with("🔗 Read more: https://example.com/a"));
    }

    #[test]
    fn test_fallback_short_body_kept_whole() {
        let msg = fallback_message("T", "short body", "L");
        assert_eq!(msg, "🔥 **T**\n\nshort body...\n\n🔗 Read more: L");
    }

    #[test]
    fn test_refusal_detection_case_insensitive() {
        assert!(looks_like_refusal("i APOLOGIZE, but I can't"));
        assert!(looks_like_refusal(
            "This article appears to be from a future date."
        ));
        assert!(looks_like_refusal("Sorry, I'm unable to help with that"));
    }

    #[test]
    fn test_normal_post_is_not_refusal() {
        assert!(!looks_like_refusal(
            "🎯 **HEADLINE**: Rust 2.0 ships\n\n📝 **TL;DR**: faster builds"
        ));
    }

    #[test]
    fn test_verdict_from_reply() {
        assert_eq!(Verdict::from_reply("VALID"), Verdict::Valid);
        assert_eq!(Verdict::from_reply("  VALID\n"), Verdict::Valid);
        assert_eq!(
            Verdict::from_reply("SKIP_NO_CONTENT"),
            Verdict::Invalid("SKIP_NO_CONTENT".into())
        );
        assert_eq!(
            Verdict::from_reply("valid"),
            Verdict::Invalid("valid".into())
        );
    }
}
