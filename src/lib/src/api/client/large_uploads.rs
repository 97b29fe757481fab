//! Resumable large file uploads, `/api/upload/large/*`
//!
//! A file is uploaded by creating a session with `init`, sending every chunk
//! with `upload_chunk` as multipart form data, then asking the server to
//! assemble it with `finalize`. `status` reports what the server holds and
//! `abort` discards the session.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::api;
use crate::api::client;
use crate::config::ApiConfig;
use crate::constants::{
    LARGE_UPLOAD_ABORT_PATH, LARGE_UPLOAD_CHUNK_PATH, LARGE_UPLOAD_FINALIZE_PATH,
    LARGE_UPLOAD_INIT_PATH, LARGE_UPLOAD_STATUS_PATH,
};
use crate::error::RestoreError;
use crate::uploader::{cancellable, ChunkTransport};
use crate::view::{
    AbortUploadRequest, AbortUploadResponse, ChunkUploadResponse, FinalizeUploadRequest,
    FinalizeUploadResponse, InitUploadRequest, InitUploadResponse, UploadStatusResponse,
};

/// Create an upload session
pub async fn init(
    client: &Client,
    host: &str,
    request: &InitUploadRequest,
) -> Result<InitUploadResponse, RestoreError> {
    let url = api::endpoint::url_from_host(host, LARGE_UPLOAD_INIT_PATH)?;
    log::debug!(
        "api::client::large_uploads::init {} {} ({} bytes, {} chunks)",
        url,
        request.file_name,
        request.file_size,
        request.total_chunks
    );

    let res = client.post(&url).json(request).send().await?;
    let body = client::parse_json_body(&url, res).await?;
    let response: InitUploadResponse = client::deserialize_body(&url, &body)?;
    if response.upload_id.is_empty() {
        return Err(RestoreError::unexpected_response(&url, "empty upload id"));
    }
    Ok(response)
}

/// Send one chunk as multipart form data
pub async fn upload_chunk(
    client: &Client,
    host: &str,
    upload_id: &str,
    chunk_index: u64,
    total_chunks: u64,
    chunk: Bytes,
    checksum: &str,
) -> Result<ChunkUploadResponse, RestoreError> {
    let url = api::endpoint::url_from_host(host, LARGE_UPLOAD_CHUNK_PATH)?;
    log::debug!(
        "api::client::large_uploads::upload_chunk {} {}/{} ({} bytes)",
        upload_id,
        chunk_index,
        total_chunks,
        chunk.len()
    );

    let part = Part::bytes(chunk.to_vec())
        .file_name(format!("chunk_{chunk_index}"))
        .mime_str("application/octet-stream")?;
    let form = Form::new()
        .text("uploadId", upload_id.to_string())
        .text("chunkIndex", chunk_index.to_string())
        .text("totalChunks", total_chunks.to_string())
        .part("chunk", part)
        .text("checksum", checksum.to_string());

    let res = client.post(&url).multipart(form).send().await?;
    if res.status() == StatusCode::NOT_FOUND {
        return Err(RestoreError::session_not_found(upload_id));
    }

    let body = client::parse_json_body(&url, res).await?;
    let response: ChunkUploadResponse = client::deserialize_body(&url, &body)?;
    match response.chunk_index {
        Some(acked) if acked != chunk_index => Err(RestoreError::unexpected_response(
            &url,
            format!("sent chunk {chunk_index} but server acknowledged chunk {acked}"),
        )),
        _ => Ok(response),
    }
}

/// What the server holds for a session
pub async fn status(
    client: &Client,
    host: &str,
    upload_id: &str,
) -> Result<UploadStatusResponse, RestoreError> {
    let url = api::endpoint::url_from_host(host, LARGE_UPLOAD_STATUS_PATH)?;
    log::debug!("api::client::large_uploads::status {} {}", url, upload_id);

    let res = client
        .get(&url)
        .query(&[("uploadId", upload_id)])
        .send()
        .await?;
    if res.status() == StatusCode::NOT_FOUND {
        return Err(RestoreError::session_not_found(upload_id));
    }

    let body = client::parse_json_body(&url, res).await?;
    client::deserialize_body(&url, &body)
}

/// Ask the server to assemble the chunks into the backup file
pub async fn finalize(
    client: &Client,
    host: &str,
    request: &FinalizeUploadRequest,
) -> Result<FinalizeUploadResponse, RestoreError> {
    let url = api::endpoint::url_from_host(host, LARGE_UPLOAD_FINALIZE_PATH)?;
    log::debug!(
        "api::client::large_uploads::finalize {} {}",
        url,
        request.upload_id
    );

    let res = client.post(&url).json(request).send().await?;
    if res.status() == StatusCode::NOT_FOUND {
        return Err(RestoreError::session_not_found(&request.upload_id));
    }

    let body = client::parse_json_body(&url, res).await?;
    client::deserialize_body(&url, &body)
}

/// Discard a session and whatever chunks the server holds for it
pub async fn abort(
    client: &Client,
    host: &str,
    upload_id: &str,
) -> Result<AbortUploadResponse, RestoreError> {
    let url = api::endpoint::url_from_host(host, LARGE_UPLOAD_ABORT_PATH)?;
    log::debug!("api::client::large_uploads::abort {} {}", url, upload_id);

    let request = AbortUploadRequest {
        upload_id: upload_id.to_string(),
    };
    let res = client.post(&url).json(&request).send().await?;
    let body = client::parse_json_body(&url, res).await?;
    if body.trim().is_empty() {
        return Ok(AbortUploadResponse::default());
    }
    client::deserialize_body(&url, &body)
}

/// `ChunkTransport` over HTTP to a RestoreDB server
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    host: String,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<HttpTransport, RestoreError> {
        Ok(HttpTransport {
            client: client::new_for_config(config)?,
            host: config.host.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl ChunkTransport for HttpTransport {
    async fn init(
        &self,
        request: &InitUploadRequest,
        cancel: &CancellationToken,
    ) -> Result<InitUploadResponse, RestoreError> {
        cancellable(cancel, init(&self.client, &self.host, request)).await
    }

    async fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_index: u64,
        total_chunks: u64,
        chunk: Bytes,
        checksum: &str,
        cancel: &CancellationToken,
    ) -> Result<ChunkUploadResponse, RestoreError> {
        let request = upload_chunk(
            &self.client,
            &self.host,
            upload_id,
            chunk_index,
            total_chunks,
            chunk,
            checksum,
        );
        cancellable(cancel, request).await
    }

    async fn status(
        &self,
        upload_id: &str,
        cancel: &CancellationToken,
    ) -> Result<UploadStatusResponse, RestoreError> {
        cancellable(cancel, status(&self.client, &self.host, upload_id)).await
    }

    async fn finalize(
        &self,
        request: &FinalizeUploadRequest,
        cancel: &CancellationToken,
    ) -> Result<FinalizeUploadResponse, RestoreError> {
        cancellable(cancel, finalize(&self.client, &self.host, request)).await
    }

    async fn abort(&self, upload_id: &str) -> Result<AbortUploadResponse, RestoreError> {
        abort(&self.client, &self.host, upload_id).await
    }
}
