use std::fmt::Debug;

use crate::error::RestoreError;
use crate::model::ResumeRecord;

/// Trait defining where resumability records live between runs.
///
/// Keys come from `UploadSource::storage_key`. A store holds at most one
/// record per key, writing a key again replaces its record.
pub trait ResumeStore: Debug + Send + Sync + 'static {
    /// Fetch the record for a key
    ///
    /// # Arguments
    /// * `key` - The storage key of the file
    ///
    /// Unreadable records are reported as absent.
    fn get(&self, key: &str) -> Result<Option<ResumeRecord>, RestoreError>;

    /// Write or replace the record for a key
    ///
    /// # Arguments
    /// * `key` - The storage key of the file
    /// * `record` - Progress to persist
    fn put(&self, key: &str, record: &ResumeRecord) -> Result<(), RestoreError>;

    /// Delete the record for a key, a missing record is not an error
    fn remove(&self, key: &str) -> Result<(), RestoreError>;

    /// All readable records with their keys
    fn list(&self) -> Result<Vec<(String, ResumeRecord)>, RestoreError>;

    /// Get the storage type identifier
    fn storage_type(&self) -> &str;
}
