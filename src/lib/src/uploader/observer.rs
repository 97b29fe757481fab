use crate::error::RestoreError;
use crate::model::UploadStatus;
use crate::view::FinalizeUploadResponse;

/// Callbacks fired by a `ChunkedUploader` as the upload moves along.
///
/// Callbacks run while the uploader holds its internal lock, which keeps
/// them ordered with `pause` and `abort`. They must return quickly and must
/// not call back into the uploader.
pub trait UploadObserver: Send + Sync {
    /// Percentage in 0..=100, after every acknowledged chunk and status poll
    fn on_progress(&self, _progress: u8) {}

    fn on_chunk_complete(&self, _chunk_index: u64, _received: u64, _total: u64) {}

    fn on_complete(&self, _response: &FinalizeUploadResponse) {}

    fn on_error(&self, _error: &RestoreError) {}

    fn on_status_change(&self, _status: UploadStatus) {}
}

/// Ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}
