//! Delivering finished posts to the chat channel.
//!
//! A [`Publisher`] sends one message-sized chunk at a time; the provided
//! [`Publisher::publish`] splits longer text into ordered chunks. Nothing is
//! retried: the first failed chunk ends delivery of that message.

mod discord;

pub use discord::DiscordPublisher;

use crate::util::split_chunks;
use async_trait::async_trait;
use thiserror::Error;

/// Discord's per-message content limit, in characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("Refusing to publish an empty message")]
    Empty,
    #[error("Chunk {index} of {total} failed: {source}")]
    Chunk {
        index: usize,
        total: usize,
        #[source]
        source: Box<PublishError>,
    },
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Largest message, in characters, the destination accepts.
    fn max_message_chars(&self) -> usize {
        DISCORD_MESSAGE_LIMIT
    }

    /// Delivers text that is already within [`Self::max_message_chars`].
    async fn send_chunk(&self, chunk: &str) -> Result<(), PublishError>;

    /// Delivers text of any length, in order, one chunk per message.
    /// Returns the number of chunks sent.
    async fn publish(&self, text: &str) -> Result<usize, PublishError> {
        let chunks = split_chunks(text, self.max_message_chars());
        if chunks.is_empty() {
            return Err(PublishError::Empty);
        }

        let total = chunks.len();
        for (index, chunk) in chunks.into_iter().enumerate() {
            self.send_chunk(chunk)
                .await
                .map_err(|source| PublishError::Chunk {
                    index: index + 1,
                    total,
                    source: Box::new(source),
                })?;
        }

        Ok(total)
    }
}

/// Logs posts instead of sending them (`--dry-run`).
#[derive(Debug, Default)]
pub struct DryRunPublisher;

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn send_chunk(&self, chunk: &str) -> Result<(), PublishError> {
        tracing::info!(chars = chunk.chars().count(), "[dry-run] would post:\n{}", chunk);
        Ok(())
    }
}
