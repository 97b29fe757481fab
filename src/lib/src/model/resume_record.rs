use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::UploadSource;

/// What survives a restart of the process: enough to ask the server where an
/// upload left off.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub upload_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub total_chunks: u64,
    pub received_chunks: Vec<u64>,
    /// Epoch milliseconds of the last write
    pub timestamp: i64,
    /// Chunk size agreed with the server, absent in records from older clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u64>,
}

impl ResumeRecord {
    /// A record only applies to the exact file it was written for
    pub fn matches(&self, source: &UploadSource) -> bool {
        self.file_name == source.file_name && self.file_size == source.file_size
    }

    pub fn age(&self, now_ms: i64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.timestamp).max(0) as u64)
    }

    pub fn is_expired(&self, now_ms: i64, ttl: Duration) -> bool {
        self.age(now_ms) > ttl
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::constants::RESUME_RECORD_TTL;
    use crate::model::{ResumeRecord, UploadSource};

    fn record(timestamp: i64) -> ResumeRecord {
        ResumeRecord {
            upload_id: "u1".to_string(),
            file_name: "nightly.fbk".to_string(),
            file_size: 1024,
            total_chunks: 4,
            received_chunks: vec![0, 1],
            timestamp,
            chunk_size: None,
        }
    }

    #[test]
    fn test_expiry_after_seven_days() {
        let written = 1_000_000;
        let six_days = Duration::from_secs(6 * 24 * 60 * 60).as_millis() as i64;
        let eight_days = Duration::from_secs(8 * 24 * 60 * 60).as_millis() as i64;

        let record = record(written);
        assert!(!record.is_expired(written + six_days, RESUME_RECORD_TTL));
        assert!(record.is_expired(written + eight_days, RESUME_RECORD_TTL));
        // clock went backwards
        assert!(!record.is_expired(written - 10, RESUME_RECORD_TTL));
    }

    #[test]
    fn test_matches_name_and_size() {
        let record = record(0);
        let mut source = UploadSource {
            path: PathBuf::from("/backups/nightly.fbk"),
            file_name: "nightly.fbk".to_string(),
            file_size: 1024,
            last_modified: 7,
        };
        assert!(record.matches(&source));
        source.file_size = 2048;
        assert!(!record.matches(&source));
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(record(42)).unwrap();
        assert_eq!(json["uploadId"], "u1");
        assert_eq!(json["receivedChunks"], serde_json::json!([0, 1]));
        assert_eq!(json["timestamp"], 42);
        assert!(json.get("chunkSize").is_none());

        let parsed: ResumeRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.chunk_size, None);
    }
}
