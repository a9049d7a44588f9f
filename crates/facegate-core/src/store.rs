//! Persistent encoding store.
//!
//! Names and encodings are held as two parallel sequences and written to a
//! single JSON file `{ "names": [...], "encodings": [[...], ...] }` where
//! `names[i]` belongs to `encodings[i]`. Every mutation is persisted before it
//! returns; if persisting fails the mutation is undone in memory.

use crate::types::{Embedding, Identity};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("encoding store {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("encoding store I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding store serialization: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("identity name must not be empty")]
    InvalidName,
    #[error("encoding has {actual} dimensions, store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    names: Vec<String>,
    encodings: Vec<Vec<f32>>,
}

/// Named face encodings backed by a JSON file.
#[derive(Debug)]
pub struct EncodingStore {
    path: PathBuf,
    dimension: usize,
    names: Vec<String>,
    encodings: Vec<Vec<f32>>,
}

impl EncodingStore {
    /// Load the store at `path`, creating and persisting an empty one if the
    /// file does not exist yet.
    ///
    /// Refuses to open a file whose sequences disagree in length or whose
    /// vectors are not `dimension` long.
    pub fn open(path: impl Into<PathBuf>, dimension: usize) -> Result<Self, StoreError> {
        let path = path.into();

        if !path.exists() {
            let store = Self {
                path,
                dimension,
                names: Vec::new(),
                encodings: Vec::new(),
            };
            store.save()?;
            tracing::info!(path = %store.path.display(), "created empty encoding store");
            return Ok(store);
        }

        let raw = fs::read(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let file: StoreFile = serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        validate(&file, dimension).map_err(|reason| StoreError::Corrupt {
            path: path.clone(),
            reason,
        })?;

        tracing::info!(path = %path.display(), identities = file.names.len(), "loaded encoding store");

        Ok(Self {
            path,
            dimension,
            names: file.names,
            encodings: file.encodings,
        })
    }

    /// Write the full store atomically: temp file in the same directory,
    /// fsync, then rename over the target.
    pub fn save(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let body = serde_json::to_vec(&StoreFileRef {
            names: &self.names,
            encodings: &self.encodings,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp = self.tmp_path();
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(e));
        }
        Ok(())
    }

    /// Enroll one identity. Duplicate names are allowed.
    pub fn append(&mut self, name: &str, encoding: Embedding) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidName);
        }
        if encoding.dimension() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: encoding.dimension(),
            });
        }

        self.names.push(name.to_string());
        self.encodings.push(encoding.values);

        if let Err(e) = self.save() {
            self.names.pop();
            self.encodings.pop();
            return Err(e);
        }

        tracing::info!(name, total = self.names.len(), "identity enrolled");
        Ok(())
    }

    /// Remove every entry called `name`. Returns how many were removed.
    pub fn delete_by_name(&mut self, name: &str) -> Result<usize, StoreError> {
        let before = self.names.len();
        let (names, encodings): (Vec<String>, Vec<Vec<f32>>) = self
            .names
            .iter()
            .cloned()
            .zip(self.encodings.iter().cloned())
            .filter(|(n, _)| n != name)
            .unzip();

        let removed = before - names.len();
        if removed == 0 {
            return Ok(0);
        }

        let old_names = std::mem::replace(&mut self.names, names);
        let old_encodings = std::mem::replace(&mut self.encodings, encodings);

        if let Err(e) = self.save() {
            self.names = old_names;
            self.encodings = old_encodings;
            return Err(e);
        }

        tracing::info!(name, removed, total = self.names.len(), "identity deleted");
        Ok(removed)
    }

    /// Snapshot of all identities in store order.
    pub fn identities(&self) -> Vec<Identity> {
        self.names
            .iter()
            .zip(self.encodings.iter())
            .map(|(name, encoding)| Identity {
                name: name.clone(),
                encoding: Embedding::new(encoding.clone()),
            })
            .collect()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "encodings".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Borrowed view of [`StoreFile`] for serialization without cloning.
#[derive(Serialize)]
struct StoreFileRef<'a> {
    names: &'a [String],
    encodings: &'a [Vec<f32>],
}

fn validate(file: &StoreFile, dimension: usize) -> Result<(), String> {
    if file.names.len() != file.encodings.len() {
        return Err(format!(
            "{} names but {} encodings",
            file.names.len(),
            file.encodings.len()
        ));
    }
    for (i, (name, encoding)) in file.names.iter().zip(file.encodings.iter()).enumerate() {
        if name.trim().is_empty() {
            return Err(format!("entry {i} has an empty name"));
        }
        if encoding.len() != dimension {
            return Err(format!(
                "entry {i} ({name}) has {} dimensions, expected {dimension}",
                encoding.len()
            ));
        }
        if encoding.iter().any(|v| !v.is_finite()) {
            return Err(format!("entry {i} ({name}) has non-finite values"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIM: usize = 3;

    fn enc(v: f32) -> Embedding {
        Embedding::new(vec![v, v + 1.0, v + 2.0])
    }

    fn open(dir: &TempDir) -> EncodingStore {
        EncodingStore::open(dir.path().join("encodings.json"), DIM).unwrap()
    }

    #[test]
    fn test_open_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/encodings.json");
        let store = EncodingStore::open(&path, DIM).unwrap();

        assert!(store.is_empty());
        assert!(path.exists());
        let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({ "names": [], "encodings": [] }));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.append("alice", enc(0.5)).unwrap();
        store.append("bob", enc(-1.25)).unwrap();
        store.append("alice", enc(3.0)).unwrap();
        let before = store.identities();

        let reloaded = open(&dir);
        assert_eq!(reloaded.identities(), before);
        assert_eq!(reloaded.names(), &["alice", "bob", "alice"]);
    }

    #[test]
    fn test_delete_removes_all_duplicates() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.append("A", enc(1.0)).unwrap();
        store.append("B", enc(2.0)).unwrap();
        store.append("A", enc(3.0)).unwrap();

        assert_eq!(store.delete_by_name("A").unwrap(), 2);
        assert_eq!(store.names(), &["B"]);
        assert_eq!(store.identities()[0].encoding, enc(2.0));

        let reloaded = open(&dir);
        assert_eq!(reloaded.identities(), store.identities());
    }

    #[test]
    fn test_delete_missing_returns_zero() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.append("A", enc(1.0)).unwrap();
        assert_eq!(store.delete_by_name("Z").unwrap(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_lengths_stay_in_lockstep() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let ops: [(&str, bool); 8] = [
            ("a", true), ("b", true), ("a", false), ("c", true),
            ("c", true), ("b", false), ("z", false), ("c", false),
        ];
        for (i, (name, add)) in ops.into_iter().enumerate() {
            if add {
                store.append(name, enc(i as f32)).unwrap();
            } else {
                store.delete_by_name(name).unwrap();
            }
            assert_eq!(store.names.len(), store.encodings.len());
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);

        assert!(matches!(store.append("  ", enc(1.0)), Err(StoreError::InvalidName)));
        assert!(matches!(
            store.append("x", Embedding::new(vec![1.0])),
            Err(StoreError::DimensionMismatch { expected: 3, actual: 1 })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_open_rejects_length_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("encodings.json");
        fs::write(&path, r#"{"names":["a","b"],"encodings":[[1,2,3]]}"#).unwrap();

        let err = EncodingStore::open(&path, DIM).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "{err}");
    }

    #[test]
    fn test_open_rejects_wrong_dimension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("encodings.json");
        fs::write(&path, r#"{"names":["a"],"encodings":[[1,2]]}"#).unwrap();

        let err = EncodingStore::open(&path, DIM).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "{err}");
    }

    #[test]
    fn test_open_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("encodings.json");
        fs::write(&path, b"{\"names\": [\"a\"], \"encod").unwrap();

        assert!(matches!(
            EncodingStore::open(&path, DIM),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_stale_tmp_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.append("a", enc(1.0)).unwrap();
        // A crash mid-write leaves only the temp file behind.
        fs::write(dir.path().join("encodings.json.tmp"), b"{\"names\":[\"half").unwrap();

        let reloaded = open(&dir);
        assert_eq!(reloaded.names(), &["a"]);
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.append("a", enc(1.0)).unwrap();

        // Occupy the temp path with a directory so the write fails.
        fs::create_dir(dir.path().join("encodings.json.tmp")).unwrap();

        assert!(matches!(store.append("b", enc(2.0)), Err(StoreError::Io { .. })));
        assert_eq!(store.names(), &["a"]);
        assert!(store.delete_by_name("a").is_err());
        assert_eq!(store.names(), &["a"]);
    }
}
