use crate::store::{SeenRecord, StoreData, StoreError, Timestamp};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};

/// The seen-set and feed check times, backed by a JSON file.
///
/// Loading never fails: a missing, unreadable or corrupt file yields an
/// empty store. That can cause entries to be posted again after a corrupt
/// file, which is preferred over refusing to start.
#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    data: StoreData,
}

impl SeenStore {
    /// Reads the state file at `path`, migrating the legacy shape if needed.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let data = match std::fs::read_to_string(&path) {
            Ok(raw) => match StoreData::from_json(&raw) {
                Ok(data) => {
                    tracing::info!(
                        path = %path.display(),
                        posts = data.posts.len(),
                        feeds = data.last_check_times.len(),
                        "Loaded state file"
                    );
                    data
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Failed to parse state file, starting empty");
                    StoreData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No state file found, starting empty");
                StoreData::default()
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read state file, starting empty");
                StoreData::default()
            }
        };

        Self { path, data }
    }

    /// Writes the full document to a temp file and renames it over the
    /// target, so a crash leaves either the old or the new file on disk.
    pub fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&self.data)?;
        atomic_write(&self.path, &json)?;
        tracing::trace!(path = %self.path.display(), posts = self.data.posts.len(), "Saved state file");
        Ok(())
    }

    pub fn is_seen(&self, identity: &str) -> bool {
        self.data.posts.contains_key(identity)
    }

    /// Records `identity` as seen. First write wins: returns `false` and
    /// leaves the existing record untouched if the identity is already known.
    pub fn mark_seen(&mut self, identity: impl Into<String>, record: SeenRecord) -> bool {
        use std::collections::btree_map::Entry;

        match self.data.posts.entry(identity.into()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn last_check(&self, url: &str) -> Option<DateTime<Utc>> {
        self.data.last_check_times.get(url).map(|ts| ts.0)
    }

    pub fn set_last_check(&mut self, url: impl Into<String>, at: DateTime<Utc>) {
        self.data.last_check_times.insert(url.into(), Timestamp(at));
    }

    /// Number of seen entries across all feeds.
    pub fn len(&self) -> usize {
        self.data.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.posts.is_empty()
    }

    pub fn record(&self, identity: &str) -> Option<&SeenRecord> {
        self.data.posts.get(identity)
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write-to-temp-then-rename. The temp name is randomized so a stale or
/// planted file at a predictable path is never reused.
fn atomic_write(dst: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;

    let written = temp_file
        .write_all(content)
        .and_then(|()| temp_file.sync_all());
    drop(temp_file);

    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    // On Windows, rename fails if destination exists
    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = std::fs::remove_file(dst) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
    }

    std::fs::rename(&temp_path, dst).inspect_err(|_| {
        let _ = std::fs::remove_file(&temp_path);
    })
}
