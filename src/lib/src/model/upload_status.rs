use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a chunked upload as reported to observers.
///
/// ```text
/// initializing -> uploading <-> paused
///                 uploading -> finalizing -> completed
/// any non terminal state -> error | aborted
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Initializing,
    Uploading,
    Paused,
    Finalizing,
    Completed,
    Error,
    Aborted,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::Error | UploadStatus::Aborted
        )
    }

    /// True while a task is driving the upload forward
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            UploadStatus::Initializing | UploadStatus::Uploading | UploadStatus::Finalizing
        )
    }

    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        use UploadStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Error) | (_, Aborted) => true,
            (Initializing, Uploading) => true,
            (Uploading, Paused) | (Uploading, Finalizing) => true,
            // the server forgot the session and it has to be created again
            (Uploading, Initializing) | (Finalizing, Initializing) => true,
            (Paused, Uploading) => true,
            (Finalizing, Completed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Initializing => "initializing",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Paused => "paused",
            UploadStatus::Finalizing => "finalizing",
            UploadStatus::Completed => "completed",
            UploadStatus::Error => "error",
            UploadStatus::Aborted => "aborted",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
