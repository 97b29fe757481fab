use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::RestoreError;
use crate::model::ResumeRecord;
use crate::storage::resume_store::ResumeStore;

/// Records kept for the life of the process only
#[derive(Debug, Default)]
pub struct MemoryResumeStore {
    records: Mutex<HashMap<String, ResumeRecord>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ResumeStore for MemoryResumeStore {
    fn get(&self, key: &str) -> Result<Option<ResumeRecord>, RestoreError> {
        Ok(self.records.lock().get(key).cloned())
    }

    fn put(&self, key: &str, record: &ResumeRecord) -> Result<(), RestoreError> {
        self.records.lock().insert(key.to_string(), record.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), RestoreError> {
        self.records.lock().remove(key);
        Ok(())
    }

    fn list(&self) -> Result<Vec<(String, ResumeRecord)>, RestoreError> {
        let mut records: Vec<(String, ResumeRecord)> = self
            .records
            .lock()
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();
        records.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
        Ok(records)
    }

    fn storage_type(&self) -> &str {
        "memory"
    }
}
