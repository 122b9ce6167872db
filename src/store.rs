//! Failure database.
//!
//! One file per property, named by the SHA-256 of the property id. Each file
//! is a small binary container:
//!
//! ```text
//! [4B magic "STPF"] [4B schema version u32 LE] [bincode payload]
//! ```
//!
//! Files are replaced atomically (write to a temp file, then rename). Entries
//! are only removed on explicit request.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::diagnostics::StoreError;
use crate::generator::Trace;
use crate::oracle::ViolationKind;

/// Magic bytes identifying a failure file.
const MAGIC: &[u8; 4] = b"STPF";

/// Current schema version.
const SCHEMA_VERSION: u32 = 1;

/// Header size in bytes: magic (4) + version (4).
const HEADER_SIZE: usize = 8;

const EXTENSION: &str = "stpf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFailure {
    /// Minimized trace; replaying it through the property's generator
    /// reproduces the counterexample.
    pub trace: Trace,
    /// Rendered counterexample at the time it was recorded.
    pub input: String,
    pub kind: ViolationKind,
    pub recorded_at: DateTime<Utc>,
    pub run_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub property: String,
    pub failures: Vec<StoredFailure>,
}

#[derive(Debug, Clone)]
pub struct FailureStore {
    root: PathBuf,
}

impl FailureStore {
    /// Open (creating if needed) the database directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, property: &str) -> PathBuf {
        self.root.join(format!("{}.{EXTENSION}", hex(&Sha256::digest(property.as_bytes()))))
    }

    /// Stored failures for `property`, oldest first. A missing file is empty.
    pub fn load(&self, property: &str) -> Result<Vec<StoredFailure>, StoreError> {
        let path = self.path_for(property);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let entry = read_entry(&path)?;
        Ok(entry.failures)
    }

    /// Add a failure unless an entry with the same trace is already stored.
    /// An unreadable file is replaced. Returns whether the file changed.
    pub fn record(&self, property: &str, failure: StoredFailure) -> Result<bool, StoreError> {
        let path = self.path_for(property);
        let fresh = || StoredEntry { property: property.to_string(), failures: Vec::new() };
        let mut entry = if path.exists() {
            match read_entry(&path) {
                Ok(entry) => entry,
                Err(err) if err.is_corrupt() => {
                    warn!(property, path = %path.display(), %err, "replacing corrupt failure file");
                    fresh()
                }
                Err(err) => return Err(err),
            }
        } else {
            fresh()
        };
        if entry.failures.iter().any(|f| f.trace == failure.trace) {
            return Ok(false);
        }
        entry.failures.push(failure);
        write_entry(&path, &entry)?;
        Ok(true)
    }

    /// Every readable entry in the database, sorted by property id.
    /// Corrupt files are skipped.
    pub fn list(&self) -> Result<Vec<StoredEntry>, StoreError> {
        let mut entries = Vec::new();
        for dirent in fs::read_dir(&self.root)? {
            let path = dirent?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match read_entry(&path) {
                Ok(entry) => entries.push(entry),
                Err(err) if err.is_corrupt() => {
                    warn!(path = %path.display(), %err, "skipping corrupt failure file")
                }
                Err(err) => return Err(err),
            }
        }
        entries.sort_by(|a, b| a.property.cmp(&b.property));
        Ok(entries)
    }

    pub fn remove_property(&self, property: &str) -> Result<bool, StoreError> {
        let path = self.path_for(property);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    /// Delete every failure file. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for dirent in fs::read_dir(&self.root)? {
            let path = dirent?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

pub fn encode_entry(entry: &StoredEntry) -> Result<Vec<u8>, StoreError> {
    let config = bincode::config::standard();
    let payload = bincode::serde::encode_to_vec(entry, config)
        .map_err(|e| StoreError::Encode(e.to_string()))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub fn decode_entry(data: &[u8]) -> Result<StoredEntry, StoreError> {
    if data.len() < HEADER_SIZE {
        return Err(StoreError::Truncated { expected: HEADER_SIZE, got: data.len() });
    }
    if &data[..4] != MAGIC {
        return Err(StoreError::InvalidMagic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }
    let config = bincode::config::standard();
    let (entry, _read): (StoredEntry, usize) =
        bincode::serde::decode_from_slice(&data[HEADER_SIZE..], config)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(entry)
}

fn read_entry(path: &Path) -> Result<StoredEntry, StoreError> {
    decode_entry(&fs::read(path)?)
}

fn write_entry(path: &Path, entry: &StoredEntry) -> Result<(), StoreError> {
    let bytes = encode_entry(entry)?;
    let temp_path = path.with_extension(format!("{EXTENSION}.tmp.{}", std::process::id()));
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(draws: Vec<u64>) -> StoredFailure {
        StoredFailure {
            trace: Trace::new(draws),
            input: "\"x\"".into(),
            kind: ViolationKind::RoundTripMismatch,
            recorded_at: Utc::now(),
            run_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn container_round_trip() {
        let entry = StoredEntry { property: "p".into(), failures: vec![failure(vec![1, 2, 3])] };
        let bytes = encode_entry(&entry).unwrap();
        assert_eq!(&bytes[..4], b"STPF");
        assert_eq!(decode_entry(&bytes).unwrap(), entry);
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(matches!(decode_entry(b"STP"), Err(StoreError::Truncated { expected: 8, got: 3 })));
        assert!(matches!(decode_entry(b"NOPE\x01\0\0\0"), Err(StoreError::InvalidMagic)));
        assert!(matches!(decode_entry(b"STPF\x07\0\0\0"), Err(StoreError::UnsupportedVersion(7))));
        assert!(matches!(decode_entry(b"STPF\x01\0\0\0\xff"), Err(StoreError::Decode(_))));
    }

    #[test]
    fn file_names_hash_the_property_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FailureStore::open(dir.path()).unwrap();
        let name = store.path_for("source.tokenize_round_trip");
        let file = name.file_name().unwrap().to_str().unwrap();
        assert_eq!(file.len(), 64 + ".stpf".len());
        assert!(file.ends_with(".stpf"));
        assert_ne!(name, store.path_for("source.unparse_round_trip"));
    }

    #[test]
    fn record_deduplicates_by_trace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FailureStore::open(dir.path()).unwrap();
        assert!(store.record("p", failure(vec![1])).unwrap());
        assert!(!store.record("p", failure(vec![1])).unwrap());
        assert!(store.record("p", failure(vec![2])).unwrap());
        assert_eq!(store.load("p").unwrap().len(), 2);
        assert!(store.load("q").unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_replaced_on_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FailureStore::open(dir.path()).unwrap();
        fs::write(store.path_for("p"), b"STPF\x01\0\0\0\xff").unwrap();
        assert!(matches!(store.load("p"), Err(StoreError::Decode(_))));

        assert!(store.record("p", failure(vec![4])).unwrap());
        let stored = store.load("p").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].trace, Trace::new(vec![4]));
    }

    #[test]
    fn list_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FailureStore::open(dir.path()).unwrap();
        store.record("b", failure(vec![1])).unwrap();
        fs::write(store.path_for("a"), b"garbage!garbage!").unwrap();
        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].property, "b");
        assert_eq!(store.clear().unwrap(), 2);
    }
}
