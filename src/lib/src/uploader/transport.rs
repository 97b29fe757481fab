use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::RestoreError;
use crate::view::{
    AbortUploadResponse, ChunkUploadResponse, FinalizeUploadRequest, FinalizeUploadResponse,
    InitUploadRequest, InitUploadResponse, UploadStatusResponse,
};

/// The five server operations a chunked upload is made of.
///
/// Every call but `abort` takes the token of the run it belongs to. Once the
/// token is cancelled the call must stop its request and return
/// `RestoreError::OperationCancelled`.
///
/// `upload_chunk`, `status` and `finalize` report a session the server no
/// longer knows as `RestoreError::SessionNotFound`.
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    /// Create a session, the response may override the chunk size
    async fn init(
        &self,
        request: &InitUploadRequest,
        cancel: &CancellationToken,
    ) -> Result<InitUploadResponse, RestoreError>;

    /// Send one chunk with its SHA-256 hex checksum
    async fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_index: u64,
        total_chunks: u64,
        chunk: Bytes,
        checksum: &str,
        cancel: &CancellationToken,
    ) -> Result<ChunkUploadResponse, RestoreError>;

    async fn status(
        &self,
        upload_id: &str,
        cancel: &CancellationToken,
    ) -> Result<UploadStatusResponse, RestoreError>;

    async fn finalize(
        &self,
        request: &FinalizeUploadRequest,
        cancel: &CancellationToken,
    ) -> Result<FinalizeUploadResponse, RestoreError>;

    /// Best effort, callers log failures and carry on
    async fn abort(&self, upload_id: &str) -> Result<AbortUploadResponse, RestoreError>;
}

/// Runs `fut` until it finishes or `cancel` fires. A cancelled future is
/// dropped, which aborts any request it had in flight.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, RestoreError>
where
    F: Future<Output = Result<T, RestoreError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RestoreError::operation_cancelled()),
        result = fut => result,
    }
}
