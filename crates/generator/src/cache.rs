// Persisted record of derivatives produced by earlier builds.
//
// The store is loaded once when a build starts, updated in memory as
// requests are processed, and written back once at the end (whole-file
// overwrite). It is owned by a single build; concurrent builds sharing one
// cache file are not supported.
//
// On disk it is a flat JSON object keyed by the string form of
// `CacheKey`:
//
// ```json
// {
//   "team/john.jpg@300x300.webp": {
//     "outputPath": "team/john-300x300.webp",
//     "sourceFingerprint": "2025-03-01T10:22:31.123456789Z",
//     "isPlaceholder": false
//   }
// }
// ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use site_kit_core::CacheKey;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Modification-time marker of a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_system_time(time: SystemTime) -> Self {
        let time: DateTime<Utc> = time.into();
        Fingerprint(time.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    /// Fingerprint of the file at `path`
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let modified = fs::metadata(path)?.modified()?;
        Ok(Self::from_system_time(modified))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What an earlier build produced for one [`CacheKey`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Derivative location relative to the derivative root
    pub output_path: String,
    /// `None` for placeholders, which have no source
    pub source_fingerprint: Option<Fingerprint>,
    pub is_placeholder: bool,
}

impl CacheEntry {
    pub fn derivative(output_path: String, fingerprint: Fingerprint) -> Self {
        Self {
            output_path,
            source_fingerprint: Some(fingerprint),
            is_placeholder: false,
        }
    }

    pub fn placeholder(output_path: String) -> Self {
        Self {
            output_path,
            source_fingerprint: None,
            is_placeholder: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    path: Option<PathBuf>,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl CacheStore {
    /// Store that is never persisted
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store from `path`.
    ///
    /// A missing or unreadable file, or one that is not a JSON object of
    /// entries, gives an empty store. Individual entries with malformed keys
    /// are dropped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => parse_entries(&content, &path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read image cache, starting fresh");
                HashMap::new()
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "loaded image cache");
        Self {
            path: Some(path),
            entries,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the entry for `key` still describes a usable derivative.
    ///
    /// `source` is the current fingerprint of the source file, or `None` when
    /// the source is missing. A real derivative is fresh only while the
    /// source fingerprint matches exactly; a placeholder is fresh only while
    /// the source is still missing. Both require `output_file` to exist and
    /// the recorded output path to match `expected_output`.
    pub fn is_fresh(
        &self,
        key: &CacheKey,
        expected_output: &str,
        output_file: &Path,
        source: Option<&Fingerprint>,
    ) -> bool {
        let Some(entry) = self.entries.get(key) else {
            return false;
        };

        if entry.output_path != expected_output || !output_file.exists() {
            return false;
        }

        match (entry.is_placeholder, source) {
            (true, None) => true,
            (false, Some(current)) => entry.source_fingerprint.as_ref() == Some(current),
            _ => false,
        }
    }

    /// Write the whole store back to its file, creating parent directories
    pub fn save(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let ordered: BTreeMap<String, &CacheEntry> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.to_string(), entry))
            .collect();
        let json = serde_json::to_string_pretty(&ordered).map_err(io::Error::other)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        debug!(path = %path.display(), entries = ordered.len(), "saved image cache");
        Ok(())
    }
}

fn parse_entries(content: &str, path: &Path) -> HashMap<CacheKey, CacheEntry> {
    let raw: BTreeMap<String, CacheEntry> = match serde_json::from_str(content) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse image cache, starting fresh");
            return HashMap::new();
        }
    };

    raw.into_iter()
        .filter_map(|(key, entry)| match key.parse::<CacheKey>() {
            Ok(key) => Some((key, entry)),
            Err(e) => {
                warn!(error = %e, "dropping image cache entry");
                None
            }
        })
        .collect()
}
