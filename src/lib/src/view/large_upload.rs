//! Request and response bodies of the `/api/upload/large/*` endpoints.
//!
//! The server has answered in both `snake_case` and `camelCase` over time,
//! sometimes with both spellings in one body, so response keys are folded to
//! `snake_case` before the fields are read.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::UploadMetadata;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadRequest {
    pub file_name: String,
    pub file_size: u64,
    pub total_chunks: u64,
    pub metadata: UploadMetadata,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(remote = "Self")]
pub struct InitUploadResponse {
    pub upload_id: String,
    #[serde(default)]
    pub chunk_size: Option<u64>,
    #[serde(default)]
    pub total_chunks: Option<u64>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// The server reports received chunks either as the list of indices it holds
/// or only as a count.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ReceivedChunks {
    Indices(Vec<u64>),
    Count(u64),
}

impl ReceivedChunks {
    pub fn count(&self) -> u64 {
        match self {
            ReceivedChunks::Indices(indices) => indices.len() as u64,
            ReceivedChunks::Count(count) => *count,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(remote = "Self")]
pub struct ChunkUploadResponse {
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub chunk_index: Option<u64>,
    #[serde(default)]
    pub received_chunks: Option<ReceivedChunks>,
    #[serde(default)]
    pub total_chunks: Option<u64>,
    #[serde(default)]
    pub progress: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(remote = "Self")]
pub struct UploadStatusResponse {
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub received_chunks: Option<ReceivedChunks>,
    #[serde(default)]
    pub total_chunks: Option<u64>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeUploadRequest {
    pub upload_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub metadata: UploadMetadata,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(remote = "Self")]
pub struct FinalizeUploadResponse {
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub processed_file_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AbortUploadRequest {
    pub upload_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AbortUploadResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Key of a response field in `snake_case`
fn snake_case(key: &str) -> String {
    let mut snake = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            snake.push('_');
            snake.push(c.to_ascii_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// Reads a JSON object and folds its keys to `snake_case`. When a field comes
/// in both spellings the `snake_case` one is kept.
fn snake_case_fields<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
    let fields = Map::<String, Value>::deserialize(deserializer)?;
    let mut folded = Map::new();
    for (key, value) in fields {
        let snake = snake_case(&key);
        if snake == key {
            folded.insert(snake, value);
        } else {
            folded.entry(snake).or_insert(value);
        }
    }
    Ok(Value::Object(folded))
}

macro_rules! either_case_response {
    ($($response:ty),* $(,)?) => {
        $(
            impl<'de> Deserialize<'de> for $response {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let fields = snake_case_fields(deserializer)?;
                    <$response>::deserialize(fields).map_err(de::Error::custom)
                }
            }
        )*
    };
}

either_case_response!(
    InitUploadResponse,
    ChunkUploadResponse,
    UploadStatusResponse,
    FinalizeUploadResponse,
);

/// Shape of the JSON error bodies the server sends with non 2xx statuses
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn error_or_msg(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }
}

/// Rounds the server's floating point progress into 0..=100
pub fn progress_percent(progress: f64) -> u8 {
    if progress.is_nan() {
        return 0;
    }
    progress.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use crate::error::RestoreError;
    use crate::view::large_upload::{
        progress_percent, ChunkUploadResponse, FinalizeUploadResponse, InitUploadRequest,
        InitUploadResponse, ReceivedChunks, UploadStatusResponse,
    };

    #[test]
    fn test_init_response_accepts_both_casings() -> Result<(), RestoreError> {
        let snake: InitUploadResponse = serde_json::from_str(
            r#"{"upload_id": "u1", "chunk_size": 1048576, "total_chunks": 10, "expires_at": "2026-10-25T00:00:00Z"}"#,
        )?;
        let camel: InitUploadResponse =
            serde_json::from_str(r#"{"uploadId": "u1", "chunkSize": 1048576, "totalChunks": 10}"#)?;
        assert_eq!(snake.upload_id, camel.upload_id);
        assert_eq!(snake.chunk_size, Some(1048576));
        assert_eq!(camel.total_chunks, Some(10));
        assert_eq!(camel.expires_at, None);
        Ok(())
    }

    #[test]
    fn test_response_with_both_spellings_of_a_field() -> Result<(), RestoreError> {
        let chunk: ChunkUploadResponse = serde_json::from_str(
            r#"{"chunk_index": 1, "chunkIndex": 1, "received_chunks": [0, 1], "receivedChunks": [0, 1], "progress": 10}"#,
        )?;
        assert_eq!(chunk.chunk_index, Some(1));
        assert_eq!(chunk.received_chunks, Some(ReceivedChunks::Indices(vec![0, 1])));
        assert_eq!(chunk.progress, Some(10.0));

        let init: InitUploadResponse = serde_json::from_str(
            r#"{"upload_id": "u1", "uploadId": "u1", "chunk_size": 512, "chunkSize": 512, "total_chunks": 4, "totalChunks": 4}"#,
        )?;
        assert_eq!(init.upload_id, "u1");
        assert_eq!(init.total_chunks, Some(4));

        // the snake_case spelling wins when the two disagree
        let finalized: FinalizeUploadResponse = serde_json::from_str(
            r#"{"processedFileId": "camel", "processed_file_id": "snake", "message": "ok"}"#,
        )?;
        assert_eq!(finalized.processed_file_id, Some("snake".to_string()));

        let missing_id: Result<InitUploadResponse, _> = serde_json::from_str(r#"{"chunkSize": 512}"#);
        assert!(missing_id.is_err());
        Ok(())
    }

    #[test]
    fn test_received_chunks_as_list_or_count() -> Result<(), RestoreError> {
        let listed: UploadStatusResponse =
            serde_json::from_str(r#"{"received_chunks": [0, 2, 5], "progress": 30.0}"#)?;
        assert_eq!(
            listed.received_chunks,
            Some(ReceivedChunks::Indices(vec![0, 2, 5]))
        );

        let counted: ChunkUploadResponse = serde_json::from_str(
            r#"{"upload_id": "u1", "chunk_index": 4, "received_chunks": 5, "total_chunks": 10, "progress": 50}"#,
        )?;
        assert_eq!(counted.received_chunks, Some(ReceivedChunks::Count(5)));
        assert_eq!(counted.chunk_index, Some(4));
        Ok(())
    }

    #[test]
    fn test_init_request_is_camel_case_on_the_wire() -> Result<(), RestoreError> {
        let request = InitUploadRequest {
            file_name: "nightly.fbk".to_string(),
            file_size: 42,
            total_chunks: 1,
            metadata: Default::default(),
        };
        let json = serde_json::to_value(&request)?;
        assert_eq!(json["fileName"], "nightly.fbk");
        assert_eq!(json["fileSize"], 42);
        assert_eq!(json["totalChunks"], 1);
        Ok(())
    }

    #[test]
    fn test_progress_percent_rounds_and_clamps() {
        assert_eq!(progress_percent(33.4), 33);
        assert_eq!(progress_percent(66.6), 67);
        assert_eq!(progress_percent(-3.0), 0);
        assert_eq!(progress_percent(120.0), 100);
        assert_eq!(progress_percent(f64::NAN), 0);
    }
}
