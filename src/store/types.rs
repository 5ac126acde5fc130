use crate::store::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("State file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Document Types
// ============================================================================

/// Metadata kept for an entry once it has been evaluated. Written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub processed_at: Timestamp,
}

/// Older state files store `null` for entries that had no title or link.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The on-disk document.
///
/// ```json
/// {
///   "posts": { "<identity>": { "title": "...", "link": "...", "processed_at": "..." } },
///   "last_check_times": { "<feed url>": "..." }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreData {
    pub posts: BTreeMap<String, SeenRecord>,
    #[serde(default)]
    pub last_check_times: BTreeMap<String, Timestamp>,
}

impl StoreData {
    /// Parses either the current document or the legacy shape, which was a
    /// bare identity → record map with no `last_check_times`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        if value.get("posts").is_some() {
            return serde_json::from_value(value);
        }

        tracing::info!("Migrating legacy state document");
        Ok(Self {
            posts: serde_json::from_value(value)?,
            last_check_times: BTreeMap::new(),
        })
    }
}
