//! Single-file durable store.
//!
//! The whole key space lives in one JSON document:
//!
//! ```text
//! {"version":1,"entries":{"cache:10:20":"{...}","player:state":"{...}"}}
//! ```
//!
//! Every mutation writes the complete new document to a sibling temporary
//! file, syncs it, and renames it over the original. A crash therefore
//! leaves either the old document or the new one, never a torn mix, which is
//! what makes [`KeyValueStore::save_batch`] atomic here.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::kv::KeyValueStore;

/// Current on-disk document version.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    entries: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// A [`KeyValueStore`] persisted to one JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the file exists but cannot be read, or
    /// [`DbError::Deserialization`] if it is not a valid store document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => parse_document(&path, &raw)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(DbError::Io(e)),
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "Opened file store");
        Ok(Self { path, entries })
    }

    /// Open the store, moving an undecodable file aside instead of failing.
    ///
    /// The corrupt file is renamed to `<path>.corrupt` and the store starts
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the file cannot be read or moved aside.
    pub fn open_recovering(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();
        match Self::open(path.clone()) {
            Err(DbError::Deserialization { reason, .. }) => {
                let aside = sibling(&path, "corrupt");
                fs::rename(&path, &aside)?;
                tracing::warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    reason = %reason,
                    "Discarded corrupt store file"
                );
                Ok(Self {
                    path,
                    entries: BTreeMap::new(),
                })
            }
            other => other,
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self, next: BTreeMap<String, String>) -> Result<(), DbError> {
        let document = DocumentRef {
            version: DOCUMENT_VERSION,
            entries: &next,
        };
        let bytes = serde_json::to_vec(&document)?;
        let temp = sibling(&self.path, "tmp");
        {
            let mut file = File::create(&temp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;
        self.entries = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, DbError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save_batch(&mut self, entries: &[(String, String)]) -> Result<(), DbError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut next = self.entries.clone();
        for (key, value) in entries {
            next.insert(key.clone(), value.clone());
        }
        self.commit(next)
    }

    fn remove(&mut self, key: &str) -> Result<(), DbError> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        let mut next = self.entries.clone();
        next.remove(key);
        self.commit(next)
    }

    fn keys(&self) -> Result<Vec<String>, DbError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn clear(&mut self) -> Result<(), DbError> {
        self.commit(BTreeMap::new())
    }
}

fn parse_document(path: &Path, raw: &str) -> Result<BTreeMap<String, String>, DbError> {
    let malformed = |reason: String| DbError::Deserialization {
        location: path.display().to_string(),
        reason,
    };
    let document: Document = serde_json::from_str(raw).map_err(|e| malformed(e.to_string()))?;
    if document.version != DOCUMENT_VERSION {
        return Err(malformed(format!(
            "unsupported document version {}",
            document.version
        )));
    }
    Ok(document.entries)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
