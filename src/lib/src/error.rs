//! Errors for the restoredb library
//!
//! Enumeration for all errors that can occur while talking to a RestoreDB server
//!

use derive_more::{Display, Error};
use std::io;
use std::path::Path;

pub mod string_error;

pub use crate::error::string_error::StringError;

use crate::constants::ACCEPTED_BACKUP_EXTENSIONS;

#[derive(Debug, Display, Error)]
pub enum RestoreError {
    // Upload sessions
    SessionNotFound(StringError),
    IncompleteUpload(StringError),
    RetriesExhausted(StringError),
    InvalidState(StringError),
    OperationCancelled(StringError),

    // Input validation
    InvalidFileType(StringError),
    PathDoesNotExist(StringError),

    // Remote
    Remote(StringError),
    UnexpectedResponse(StringError),

    // Config
    ConfigNotFound(StringError),

    // External Library Errors
    IO(io::Error),
    HTTP(reqwest::Error),
    JSON(serde_json::Error),
    URL(url::ParseError),
    TomlSer(toml::ser::Error),
    TomlDe(toml::de::Error),
    Join(tokio::task::JoinError),

    // Fallback
    Basic(StringError),
}

impl RestoreError {
    pub fn basic_str(s: impl AsRef<str>) -> Self {
        RestoreError::Basic(StringError::from(s.as_ref()))
    }

    pub fn session_not_found(upload_id: impl AsRef<str>) -> Self {
        let err = format!("Upload session not found on server: {}", upload_id.as_ref());
        RestoreError::SessionNotFound(StringError::from(err))
    }

    pub fn incomplete_upload(received: usize, total: u64) -> Self {
        let missing = total.saturating_sub(received as u64);
        let err = format!(
            "Upload incomplete: {received} of {total} chunks confirmed, {missing} missing"
        );
        RestoreError::IncompleteUpload(StringError::from(err))
    }

    pub fn retries_exhausted(chunk_index: u64, retries: usize, err: &RestoreError) -> Self {
        let err = format!("Chunk {chunk_index} failed after {retries} retries: {err}");
        RestoreError::RetriesExhausted(StringError::from(err))
    }

    pub fn invalid_state(s: impl AsRef<str>) -> Self {
        RestoreError::InvalidState(StringError::from(s.as_ref()))
    }

    pub fn operation_cancelled() -> Self {
        RestoreError::OperationCancelled(StringError::from("Operation cancelled"))
    }

    pub fn invalid_file_type(path: impl AsRef<Path>) -> Self {
        let err = format!(
            "Unsupported file type: {:?}. Accepted backups: .{}",
            path.as_ref(),
            ACCEPTED_BACKUP_EXTENSIONS.join(", .")
        );
        RestoreError::InvalidFileType(StringError::from(err))
    }

    pub fn path_does_not_exist(path: impl AsRef<Path>) -> Self {
        let err = format!("Path does not exist: {:?}", path.as_ref());
        RestoreError::PathDoesNotExist(StringError::from(err))
    }

    pub fn file_has_no_name(path: impl AsRef<Path>) -> Self {
        let err = format!("File has no file_name: {:?}", path.as_ref());
        RestoreError::basic_str(err)
    }

    pub fn remote(status: reqwest::StatusCode, url: impl AsRef<str>, msg: impl AsRef<str>) -> Self {
        let err = format!("API error {status} from {}: {}", url.as_ref(), msg.as_ref());
        RestoreError::Remote(StringError::from(err))
    }

    pub fn unexpected_response(url: impl AsRef<str>, msg: impl AsRef<str>) -> Self {
        let err = format!("Unexpected response from {}: {}", url.as_ref(), msg.as_ref());
        RestoreError::UnexpectedResponse(StringError::from(err))
    }

    pub fn config_dir_not_found() -> Self {
        RestoreError::ConfigNotFound(StringError::from(
            "Could not determine the user configuration directory",
        ))
    }

    pub fn is_session_not_found(&self) -> bool {
        matches!(self, RestoreError::SessionNotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RestoreError::OperationCancelled(_))
    }
}

// if you do not want to call .map_err, implement the std::convert::From trait
impl From<io::Error> for RestoreError {
    fn from(error: io::Error) -> Self {
        RestoreError::IO(error)
    }
}

impl From<reqwest::Error> for RestoreError {
    fn from(error: reqwest::Error) -> Self {
        RestoreError::HTTP(error)
    }
}

impl From<serde_json::Error> for RestoreError {
    fn from(error: serde_json::Error) -> Self {
        RestoreError::JSON(error)
    }
}

impl From<url::ParseError> for RestoreError {
    fn from(error: url::ParseError) -> Self {
        RestoreError::URL(error)
    }
}

impl From<toml::ser::Error> for RestoreError {
    fn from(error: toml::ser::Error) -> Self {
        RestoreError::TomlSer(error)
    }
}

impl From<toml::de::Error> for RestoreError {
    fn from(error: toml::de::Error) -> Self {
        RestoreError::TomlDe(error)
    }
}

impl From<tokio::task::JoinError> for RestoreError {
    fn from(error: tokio::task::JoinError) -> Self {
        RestoreError::Join(error)
    }
}

impl From<String> for RestoreError {
    fn from(error: String) -> Self {
        RestoreError::Basic(StringError::from(error))
    }
}
