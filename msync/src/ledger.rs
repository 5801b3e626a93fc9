//! Persistent artist ledger
//!
//! Maps a lower-cased artist name to its sync state (`uploaded` flag and
//! resolved MusicBrainz id) and persists the whole map as one JSON document.
//! The on-disk file is always a complete snapshot: `save` writes to a
//! sibling temp file and renames it into place, so readers never observe a
//! partial document.
//!
//! The ledger itself is not thread-safe; during parallel sync phases it is
//! owned by an exclusive lock whose critical section spans every
//! mutate+save transaction (see the sync orchestrator).

use msync_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Per-artist sync state, as stored in the ledger document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRecord {
    /// Confirmed present in the remote catalog
    pub uploaded: bool,
    /// Resolved MusicBrainz artist id, absent until resolution succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbid: Option<String>,
}

/// A ledger query result row: the record plus its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistEntry {
    pub name: String,
    pub uploaded: bool,
    pub mbid: Option<String>,
}

/// The artist ledger: in-memory map plus its on-disk location and the
/// configured ignore set
#[derive(Debug, Clone)]
pub struct ArtistLedger {
    path: PathBuf,
    ignore: HashSet<String>,
    artists: HashMap<String, ArtistRecord>,
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

impl ArtistLedger {
    /// Create an empty ledger that will persist to `path`
    pub fn new(path: impl Into<PathBuf>, ignore: HashSet<String>) -> Self {
        Self {
            path: path.into(),
            ignore,
            artists: HashMap::new(),
        }
    }

    /// Load the ledger from disk.
    ///
    /// A missing file yields an empty ledger. A corrupt file also yields an
    /// empty ledger, with a warning; starting fresh beats refusing to sync.
    pub fn load(path: impl Into<PathBuf>, ignore: HashSet<String>) -> Self {
        let path = path.into();
        let artists = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "ledger file is corrupt, starting from an empty ledger"
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "cannot read ledger file, starting from an empty ledger"
                );
                HashMap::new()
            }
        };
        Self {
            path,
            ignore,
            artists,
        }
    }

    /// Persist the full map to disk.
    ///
    /// Parent directories are created if missing. The write goes through a
    /// temp file renamed over the target, so a crash mid-save leaves the
    /// previous snapshot intact. Failures surface as `Error::Persistence`;
    /// callers log them and continue with in-memory state.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("create {}: {}", parent.display(), e))
            })?;
        }
        let document = serde_json::to_string_pretty(&self.artists)
            .map_err(|e| Error::Persistence(format!("serialize ledger: {}", e)))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, document)
            .map_err(|e| Error::Persistence(format!("write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            Error::Persistence(format!("rename into {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.artists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artists.contains_key(&normalize(name))
    }

    /// Case-insensitive membership test against the ignore set
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.contains(&normalize(name))
    }

    /// Add a single artist; a no-op if the name is already present
    pub fn add_one(&mut self, name: &str) {
        self.add_many(std::iter::once(name.to_string()));
    }

    /// Add a batch of artists. This is the primitive `add_one` delegates
    /// to; existing names are left untouched.
    pub fn add_many<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        for name in names {
            self.artists
                .entry(normalize(&name))
                .or_insert_with(ArtistRecord::default);
        }
    }

    /// Remove a single artist; a no-op if the name is absent
    pub fn remove_one(&mut self, name: &str) {
        self.remove_many(std::iter::once(name.to_string()));
    }

    /// Remove a batch of artists; absent names are skipped
    pub fn remove_many<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        for name in names {
            self.artists.remove(&normalize(&name));
        }
    }

    /// Flip the uploaded flag on. Unknown names are a caller error.
    pub fn mark_uploaded(&mut self, name: &str) -> Result<()> {
        self.record_mut(name)?.uploaded = true;
        Ok(())
    }

    /// Flip the uploaded flag off. Unknown names are a caller error.
    pub fn mark_not_uploaded(&mut self, name: &str) -> Result<()> {
        self.record_mut(name)?.uploaded = false;
        Ok(())
    }

    /// Set the resolved MusicBrainz id for an artist
    pub fn set_mbid(&mut self, name: &str, mbid: impl Into<String>) -> Result<()> {
        self.record_mut(name)?.mbid = Some(mbid.into());
        Ok(())
    }

    /// The resolved id for an artist, if any
    pub fn mbid(&self, name: &str) -> Option<&str> {
        self.artists
            .get(&normalize(name))
            .and_then(|record| record.mbid.as_deref())
    }

    fn record_mut(&mut self, name: &str) -> Result<&mut ArtistRecord> {
        let key = normalize(name);
        self.artists
            .get_mut(&key)
            .ok_or(Error::UnknownArtist(key))
    }

    /// Query the ledger, optionally filtering on the uploaded flag.
    /// Ignore-listed names are always excluded. Results are sorted by name
    /// so reporting is deterministic.
    pub fn artists(&self, uploaded: Option<bool>) -> Vec<ArtistEntry> {
        let mut entries: Vec<ArtistEntry> = self
            .artists
            .iter()
            .filter(|(name, _)| !self.is_ignored(name))
            .filter(|(_, record)| uploaded.map_or(true, |wanted| record.uploaded == wanted))
            .map(|(name, record)| ArtistEntry {
                name: name.clone(),
                uploaded: record.uploaded,
                mbid: record.mbid.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// All entries grouped by their uploaded flag (ignore-listed names
    /// excluded)
    pub fn artists_by_uploaded(&self) -> HashMap<bool, Vec<ArtistEntry>> {
        let mut grouped: HashMap<bool, Vec<ArtistEntry>> = HashMap::new();
        for entry in self.artists(None) {
            grouped.entry(entry.uploaded).or_default().push(entry);
        }
        grouped
    }

    /// The set of ids already resolved locally
    pub fn resolved_mbids(&self) -> HashSet<String> {
        self.artists
            .values()
            .filter_map(|record| record.mbid.clone())
            .collect()
    }

    /// Merge the ledger against a freshly observed artist set.
    ///
    /// Names observed but not in the ledger are added; ledger names no
    /// longer observed are removed. Ignore-listed names are never touched
    /// in either direction. Returns the sorted `(added, removed)` lists.
    pub fn merge(&mut self, observed: &HashSet<String>) -> (Vec<String>, Vec<String>) {
        let keys: HashSet<String> = self.artists.keys().cloned().collect();
        let mut added: Vec<String> = observed
            .iter()
            .filter(|name| !keys.contains(*name) && !self.is_ignored(name))
            .cloned()
            .collect();
        let mut removed: Vec<String> = keys
            .iter()
            .filter(|name| !observed.contains(*name) && !self.is_ignored(name))
            .cloned()
            .collect();
        self.add_many(added.iter().cloned());
        self.remove_many(removed.iter().cloned());
        added.sort();
        removed.sort();
        (added, removed)
    }
}
