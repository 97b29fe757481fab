use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::constants::RESUME_RECORDS_DIR;
use crate::error::RestoreError;
use crate::model::ResumeRecord;
use crate::storage::resume_store::ResumeStore;
use crate::util;

const RECORD_EXTENSION: &str = "json";

/// Local filesystem implementation of resume storage, one JSON file per key
#[derive(Debug)]
pub struct LocalResumeStore {
    /// Directory holding the record files
    root_path: PathBuf,
}

impl LocalResumeStore {
    /// Create a new LocalResumeStore
    ///
    /// # Arguments
    /// * `root_path` - Directory for the records, created on first write
    pub fn new(root_path: impl AsRef<Path>) -> Self {
        Self {
            root_path: root_path.as_ref().to_path_buf(),
        }
    }

    /// `~/.config/restoredb/uploads` on linux
    pub fn default_location() -> Result<Self, RestoreError> {
        let root_path = util::fs::restoredb_config_dir()?.join(RESUME_RECORDS_DIR);
        Ok(Self::new(root_path))
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let file_name = sanitize_filename::sanitize(key);
        self.root_path
            .join(format!("{file_name}.{RECORD_EXTENSION}"))
    }
}

impl ResumeStore for LocalResumeStore {
    fn get(&self, key: &str) -> Result<Option<ResumeRecord>, RestoreError> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = util::fs::read_from_path(&path)?;
        match serde_json::from_str(&contents) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                log::warn!("Ignoring unreadable resume record {:?}: {}", path, err);
                Ok(None)
            }
        }
    }

    fn put(&self, key: &str, record: &ResumeRecord) -> Result<(), RestoreError> {
        let path = self.record_path(key);
        let json = serde_json::to_string(record)?;
        util::fs::write_to_path(&path, json)?;
        log::debug!("Wrote resume record {:?}", path);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), RestoreError> {
        let path = self.record_path(key);
        match fs::remove_file(&path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(RestoreError::IO(err)),
        }
    }

    fn list(&self) -> Result<Vec<(String, ResumeRecord)>, RestoreError> {
        if !self.root_path.exists() {
            return Ok(vec![]);
        }

        let mut records = vec![];
        for entry in fs::read_dir(&self.root_path)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().map(|stem| stem.to_string_lossy().to_string())
            else {
                continue;
            };
            if let Some(record) = self.get(&key)? {
                records.push((key, record));
            }
        }
        records.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
        Ok(records)
    }

    fn storage_type(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalResumeStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalResumeStore::new(temp_dir.path().join("uploads"));
        (temp_dir, store)
    }

    fn record(upload_id: &str, timestamp: i64) -> ResumeRecord {
        ResumeRecord {
            upload_id: upload_id.to_string(),
            file_name: "nightly.fbk".to_string(),
            file_size: 300,
            total_chunks: 3,
            received_chunks: vec![0, 2],
            timestamp,
            chunk_size: Some(100),
        }
    }

    #[test]
    fn test_put_and_get() {
        let (_temp_dir, store) = setup();
        let key = "chunked_upload_nightly.fbk_300_1700000000000";
        assert_eq!(store.get(key).unwrap(), None);

        store.put(key, &record("u1", 1)).unwrap();
        assert_eq!(store.get(key).unwrap(), Some(record("u1", 1)));

        store.put(key, &record("u2", 2)).unwrap();
        assert_eq!(store.get(key).unwrap().unwrap().upload_id, "u2");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_temp_dir, store) = setup();
        store.put("k", &record("u1", 1)).unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_corrupt_record_reads_as_absent() {
        let (_temp_dir, store) = setup();
        util::fs::write_to_path(store.record_path("k"), "{not json").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_list_newest_first() {
        let (_temp_dir, store) = setup();
        assert!(store.list().unwrap().is_empty());

        store.put("older", &record("u1", 10)).unwrap();
        store.put("newer", &record("u2", 20)).unwrap();
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].0, "newer");
        assert_eq!(listed[1].1.upload_id, "u1");
    }

    #[test]
    fn test_keys_are_safe_file_names() {
        let (_temp_dir, store) = setup();
        let path = store.record_path("chunked_upload_../../etc_1_2");
        assert_eq!(path.parent(), Some(store.root_path()));
    }
}
