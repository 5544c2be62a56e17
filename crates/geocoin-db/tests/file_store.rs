//! Integration tests for the `geocoin-db` file-backed store.
//!
//! Each test works in its own file under the system temporary directory and
//! removes it afterwards.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc
)]

use std::fs;
use std::path::PathBuf;

use geocoin_db::{
    DbError, FileStore, KeyValueStore, PLAYER_STATE_KEY, SparseStateStore, cache_key,
};
use geocoin_types::{CellAddress, Memento};

/// A unique temp path, cleaned up (with its siblings) on drop.
struct TempPath(PathBuf);

impl TempPath {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("geocoin-{}.json", uuid::Uuid::new_v4())))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.0.file_name().unwrap().to_owned();
        name.push(suffix);
        self.0.with_file_name(name)
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
        let _ = fs::remove_file(self.sibling(".tmp"));
        let _ = fs::remove_file(self.sibling(".corrupt"));
    }
}

#[test]
fn missing_file_opens_empty() {
    let tmp = TempPath::new();
    let store = FileStore::open(&tmp.0).unwrap();
    assert!(store.keys().unwrap().is_empty());
    assert!(!tmp.0.exists());
}

#[test]
fn entries_survive_reopen() {
    let tmp = TempPath::new();
    {
        let mut store = FileStore::open(&tmp.0).unwrap();
        store.save(PLAYER_STATE_KEY, "{\"p\":1}").unwrap();
        store
            .save_batch(&[
                (cache_key(CellAddress::new(1, 2)), "m-a".to_owned()),
                (cache_key(CellAddress::new(-1, -2)), "m-b".to_owned()),
            ])
            .unwrap();
    }

    let store = FileStore::open(&tmp.0).unwrap();
    assert_eq!(store.load(PLAYER_STATE_KEY).unwrap().as_deref(), Some("{\"p\":1}"));
    assert_eq!(store.load("cache:-1:-2").unwrap().as_deref(), Some("m-b"));
    assert_eq!(store.keys().unwrap().len(), 3);
    assert!(!tmp.sibling(".tmp").exists());
}

#[test]
fn remove_and_clear_are_durable() {
    let tmp = TempPath::new();
    let mut store = FileStore::open(&tmp.0).unwrap();
    store.save("a", "1").unwrap();
    store.save("b", "2").unwrap();
    store.remove("a").unwrap();
    assert_eq!(FileStore::open(&tmp.0).unwrap().keys().unwrap(), vec!["b".to_owned()]);

    store.clear().unwrap();
    assert!(FileStore::open(&tmp.0).unwrap().keys().unwrap().is_empty());
}

#[test]
fn corrupt_file_is_rejected_by_open() {
    let tmp = TempPath::new();
    fs::write(&tmp.0, "not json at all").unwrap();
    let err = FileStore::open(&tmp.0).unwrap_err();
    assert!(matches!(err, DbError::Deserialization { .. }), "{err}");
}

#[test]
fn unknown_document_version_is_rejected() {
    let tmp = TempPath::new();
    fs::write(&tmp.0, r#"{"version":2,"entries":{}}"#).unwrap();
    assert!(matches!(
        FileStore::open(&tmp.0),
        Err(DbError::Deserialization { .. })
    ));
}

#[test]
fn recovering_open_moves_corrupt_file_aside() {
    let tmp = TempPath::new();
    fs::write(&tmp.0, "{\"version\":1,").unwrap();
    let mut store = FileStore::open_recovering(&tmp.0).unwrap();
    assert!(store.keys().unwrap().is_empty());
    assert!(tmp.sibling(".corrupt").exists());

    store.save("fresh", "yes").unwrap();
    assert_eq!(
        FileStore::open(&tmp.0).unwrap().load("fresh").unwrap().as_deref(),
        Some("yes")
    );
}

#[test]
fn sparse_store_round_trips_through_file() {
    let tmp = TempPath::new();
    let cell = CellAddress::new(369_894, -1_220_628);
    {
        let mut kv = FileStore::open(&tmp.0).unwrap();
        let mut sparse = SparseStateStore::new();
        sparse.put(cell, Memento::new("{\"version\":1}".to_owned()));
        sparse.persist(&mut kv).unwrap();
    }

    let mut kv = FileStore::open(&tmp.0).unwrap();
    let sparse = SparseStateStore::load_all(&mut kv).unwrap();
    assert_eq!(sparse.len(), 1);
    assert_eq!(sparse.get(cell).map(Memento::as_str), Some("{\"version\":1}"));
}
