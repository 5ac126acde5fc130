use anyhow::Result;
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use sha2::{Digest, Sha256};

/// A single item from a fetched feed.
///
/// Every source field is optional in the wild; the accessors resolve the
/// fallbacks in a fixed order so the rest of the pipeline never has to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// Feed-native unique id (RSS `guid`, Atom `id`), if the feed supplied one.
    pub id: Option<String>,
    pub title: String,
    pub link: Option<String>,
    /// RSS `description` / Atom `summary`.
    pub description: Option<String>,
    /// Full content body (`content:encoded` / Atom `content`).
    pub summary: Option<String>,
}

impl FeedEntry {
    /// Deduplication key: feed id, else link, else a digest of the title.
    pub fn identity(&self) -> String {
        if let Some(id) = non_blank(self.id.as_deref()) {
            return id.to_string();
        }
        if let Some(link) = non_blank(self.link.as_deref()) {
            return link.to_string();
        }

        let hash = Sha256::digest(self.title.as_bytes());
        format!("{:x}", hash)
    }

    /// Text body: description, then summary, then empty.
    pub fn body(&self) -> &str {
        non_blank(self.description.as_deref())
            .or_else(|| non_blank(self.summary.as_deref()))
            .unwrap_or("")
    }

    pub fn link_str(&self) -> &str {
        self.link.as_deref().unwrap_or("")
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Parses RSS 0.9x/1.0/2.0, Atom or JSON Feed bytes, preserving feed order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>> {
    // feed-rs synthesises an id when the feed has none; an empty id keeps
    // the link fallback in `FeedEntry::identity` reachable.
    let feed = parser::Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .build()
        .parse(bytes)?;

    Ok(feed.entries.into_iter().map(to_entry).collect())
}

fn to_entry(entry: Entry) -> FeedEntry {
    let link = pick_link(&entry.links);
    let id = if entry.id.trim().is_empty() {
        None
    } else {
        Some(entry.id.trim().to_string())
    };

    FeedEntry {
        id,
        title: entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| "Untitled".to_string()),
        link,
        description: entry.summary.map(|s| s.content),
        summary: entry.content.and_then(|c| c.body),
    }
}

fn pick_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
}
