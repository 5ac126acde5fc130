//! One pass over all configured feeds.
//!
//! For each feed, in configuration order:
//!
//! 1. skip it if it was checked less than `check_interval` ago
//! 2. fetch it; on failure or an empty feed, record the check time and move on
//! 3. mark every unseen entry as seen and persist the store
//! 4. cap the new entries (3 on a first run, `max_posts_per_feed` otherwise)
//! 5. validate, rewrite and publish each surviving entry, pausing between posts
//! 6. persist the store, record the check time, persist again
//!
//! New identities reach disk before the first post goes out, so a crash
//! mid-feed drops the unposted entries instead of posting them twice.
//!
//! The driver assumes it is the only writer of the [`SeenStore`] it is given.
//! Two drivers (or two processes) sharing a state file will lose updates.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::content::{fallback_message, looks_like_refusal, ContentTransformer, Verdict};
use crate::feed::{FeedEntry, FeedSource};
use crate::publish::Publisher;
use crate::store::{SeenRecord, SeenStore, Timestamp};

/// Post cap applied when the store looks freshly created.
pub const BOOTSTRAP_POST_CAP: usize = 3;

/// How much earlier than `check_interval` a feed may be checked again. The
/// timer period equals the interval, so ticks arriving a hair early must not
/// throttle a feed for a whole extra period.
pub const THROTTLE_SLACK: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSettings {
    pub check_interval: Duration,
    pub max_posts_per_feed: usize,
    pub validate_content: bool,
    pub post_delay: Duration,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60 * 60),
            max_posts_per_feed: 2,
            validate_content: true,
            post_delay: Duration::from_secs(2),
        }
    }
}

/// What happened to one entry that survived the cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Posted { chunks: usize, fallback: bool },
    /// The validator said no; carries its reason.
    Rejected(String),
    /// The transformer replied with an apology instead of a post.
    Refused,
    PublishFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSummary {
    pub fetched: usize,
    /// Entries not seen before this cycle; all of them are now marked seen.
    pub new_entries: usize,
    pub bootstrap: bool,
    /// One outcome per entry that survived the cap, in feed order.
    pub entries: Vec<EntryOutcome>,
}

impl FeedSummary {
    pub fn posted(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, EntryOutcome::Posted { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    Throttled { since: Duration },
    FetchFailed(String),
    Empty,
    Processed(FeedSummary),
}

#[derive(Debug, Default)]
pub struct CycleReport {
    /// `(feed url, outcome)` in the order feeds were visited.
    pub feeds: Vec<(String, FeedOutcome)>,
}

impl CycleReport {
    pub fn outcome(&self, url: &str) -> Option<&FeedOutcome> {
        self.feeds.iter().find(|(u, _)| u == url).map(|(_, o)| o)
    }

    pub fn posted(&self) -> usize {
        self.feeds
            .iter()
            .map(|(_, o)| match o {
                FeedOutcome::Processed(summary) => summary.posted(),
                _ => 0,
            })
            .sum()
    }
}

pub struct CycleDriver {
    feeds: Vec<String>,
    source: Arc<dyn FeedSource>,
    transformer: Arc<dyn ContentTransformer>,
    publisher: Arc<dyn Publisher>,
    settings: CycleSettings,
}

impl CycleDriver {
    pub fn new(
        feeds: Vec<String>,
        source: Arc<dyn FeedSource>,
        transformer: Arc<dyn ContentTransformer>,
        publisher: Arc<dyn Publisher>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            feeds,
            source,
            transformer,
            publisher,
            settings,
        }
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Runs every feed once. Nothing in here fails the cycle: each error is
    /// logged and the driver moves on to the next entry or feed.
    pub async fn run_cycle(&self, store: &mut SeenStore, now: DateTime<Utc>) -> CycleReport {
        tracing::info!(feeds = self.feeds.len(), "Checking RSS feeds for new posts");

        let mut report = CycleReport::default();
        for url in &self.feeds {
            let outcome = self.process_feed(url, store, now).await;
            report.feeds.push((url.clone(), outcome));
        }

        tracing::info!(posted = report.posted(), "Cycle complete");
        report
    }

    async fn process_feed(
        &self,
        url: &str,
        store: &mut SeenStore,
        now: DateTime<Utc>,
    ) -> FeedOutcome {
        if let Some(since) = self.throttled_for(store, url, now) {
            tracing::info!(
                feed = %url,
                minutes_ago = %format!("{:.1}", since.as_secs_f64() / 60.0),
                "Skipping feed, checked recently"
            );
            return FeedOutcome::Throttled { since };
        }

        tracing::info!(feed = %url, "Processing feed");
        let entries = match self.source.fetch(url).await {
            Ok(entries) if !entries.is_empty() => entries,
            result => {
                let outcome = match result {
                    Err(e) => {
                        tracing::warn!(feed = %url, error = %e, "Failed to fetch feed");
                        FeedOutcome::FetchFailed(e.to_string())
                    }
                    Ok(_) => {
                        tracing::warn!(feed = %url, "No entries found in feed");
                        FeedOutcome::Empty
                    }
                };
                store.set_last_check(url, now);
                persist(store);
                return outcome;
            }
        };

        let fetched = entries.len();
        let mut fresh = select_new(store, entries, now);
        let new_entries = fresh.len();

        // Heuristic: if everything in the store was found just now, this is
        // the first evaluation. A feed with very few entries can keep
        // matching this.
        let bootstrap = store.len() <= new_entries;
        let cap = if bootstrap {
            BOOTSTRAP_POST_CAP
        } else {
            self.settings.max_posts_per_feed
        };
        fresh.truncate(cap);
        if new_entries > 0 {
            persist(store);
        }

        if bootstrap && new_entries > 0 {
            tracing::info!(
                feed = %url,
                posting = fresh.len(),
                new = new_entries,
                "First run detected, limiting to most recent posts"
            );
        } else if new_entries > fresh.len() {
            tracing::info!(
                feed = %url,
                posting = fresh.len(),
                new = new_entries,
                "Limiting posts for feed to prevent spam"
            );
        }

        let mut outcomes = Vec::with_capacity(fresh.len());
        if fresh.is_empty() {
            tracing::info!(feed = %url, "No new posts found");
        } else {
            tracing::info!(feed = %url, count = fresh.len(), "Found new posts");
        }

        for entry in &fresh {
            outcomes.push(self.process_entry(entry).await);
            persist(store);
        }

        persist(store);
        store.set_last_check(url, now);
        persist(store);

        FeedOutcome::Processed(FeedSummary {
            fetched,
            new_entries,
            bootstrap,
            entries: outcomes,
        })
    }

    fn throttled_for(
        &self,
        store: &SeenStore,
        url: &str,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let last = store.last_check(url)?;
        // A check "in the future" (clock moved back) counts as just checked.
        let since = (now - last).to_std().unwrap_or(Duration::ZERO);
        (since + THROTTLE_SLACK < self.settings.check_interval).then_some(since)
    }

    async fn process_entry(&self, entry: &FeedEntry) -> EntryOutcome {
        let title = entry.title.as_str();
        let body = entry.body();
        let link = entry.link_str();

        if self.settings.validate_content {
            match self.transformer.validate(title, body, link).await {
                Ok(Verdict::Valid) => {}
                Ok(Verdict::Invalid(reason)) => {
                    tracing::info!(
                        title = %title,
                        reason = %reason,
                        "Skipping article, failed validation"
                    );
                    return EntryOutcome::Rejected(reason);
                }
                Err(e) => {
                    tracing::warn!(
                        title = %title,
                        error = %e,
                        "Validation failed, proceeding with processing"
                    );
                }
            }
        }

        let (message, fallback) = match self.transformer.transform(title, body, link).await {
            Ok(text) if looks_like_refusal(&text) => {
                tracing::info!(title = %title, "Skipping article, model returned an error message");
                return EntryOutcome::Refused;
            }
            Ok(text) => (text, false),
            Err(e) => {
                tracing::warn!(
                    title = %title,
                    error = %e,
                    "Rewrite failed, using fallback formatting"
                );
                (fallback_message(title, body, link), true)
            }
        };

        let outcome = match self.publisher.publish(&message).await {
            Ok(chunks) => {
                tracing::info!(title = %title, chunks, "Message sent successfully");
                EntryOutcome::Posted { chunks, fallback }
            }
            Err(e) => {
                tracing::error!(title = %title, error = %e, "Failed to publish message");
                EntryOutcome::PublishFailed(e.to_string())
            }
        };

        tokio::time::sleep(self.settings.post_delay).await;
        outcome
    }
}

/// Marks every unseen entry as seen and returns those entries in feed order.
fn select_new(
    store: &mut SeenStore,
    entries: Vec<FeedEntry>,
    now: DateTime<Utc>,
) -> Vec<FeedEntry> {
    entries
        .into_iter()
        .filter(|entry| {
            let record = SeenRecord {
                title: entry.title.clone(),
                link: entry.link_str().to_string(),
                processed_at: Timestamp(now),
            };
            store.mark_seen(entry.identity(), record)
        })
        .collect()
}

fn persist(store: &SeenStore) {
    if let Err(e) = store.save() {
        tracing::error!(path = %store.path().display(), error = %e, "Failed to save state file");
    }
}
