//! Drives one file through init, chunk transmission, reconciliation and
//! finalize, with pause, resume and abort from any task.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::constants::RESUME_RECORD_TTL;
use crate::error::RestoreError;
use crate::model::{ResumeRecord, UploadMetadata, UploadSession, UploadSource, UploadStatus};
use crate::opts::UploadOpts;
use crate::storage::ResumeStore;
use crate::uploader::retry::{exponential_backoff, is_retryable, sleep_or_cancel};
use crate::uploader::{ChunkTransport, UploadObserver};
use crate::util;
use crate::view::{
    ChunkUploadResponse, FinalizeUploadRequest, FinalizeUploadResponse, InitUploadRequest,
};

struct Inner {
    session: UploadSession,
    /// Token of the current run, replaced on every start and resume
    cancel: CancellationToken,
}

/// Resumable chunked upload of a single file.
///
/// Share it behind an `Arc`: one task awaits `start` or `resume` while others
/// may call `pause` or `abort` at any time.
pub struct ChunkedUploader {
    source: UploadSource,
    metadata: UploadMetadata,
    opts: UploadOpts,
    transport: Arc<dyn ChunkTransport>,
    store: Arc<dyn ResumeStore>,
    observer: Arc<dyn UploadObserver>,
    inner: Mutex<Inner>,
}

impl ChunkedUploader {
    pub fn new(
        source: UploadSource,
        metadata: UploadMetadata,
        opts: UploadOpts,
        transport: Arc<dyn ChunkTransport>,
        store: Arc<dyn ResumeStore>,
        observer: Arc<dyn UploadObserver>,
    ) -> ChunkedUploader {
        let session = UploadSession::new(&source, metadata.clone(), opts.chunk_size);
        ChunkedUploader {
            source,
            metadata,
            opts,
            transport,
            store,
            observer,
            inner: Mutex::new(Inner {
                session,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn source(&self) -> &UploadSource {
        &self.source
    }

    pub fn status(&self) -> Option<UploadStatus> {
        self.inner.lock().session.status
    }

    pub fn progress(&self) -> u8 {
        self.inner.lock().session.progress()
    }

    pub fn upload_id(&self) -> String {
        self.inner.lock().session.upload_id.clone()
    }

    /// Snapshot of the current session
    pub fn session(&self) -> UploadSession {
        self.inner.lock().session.clone()
    }

    /// Uploads the file from scratch, discarding any record of earlier runs.
    ///
    /// Returns `Completed`, or `Paused` / `Aborted` when another task paused
    /// or aborted the upload while this call was running. Failures move the
    /// upload to `error`, are sent to `on_error`, and are returned.
    pub async fn start(&self) -> Result<UploadStatus, RestoreError> {
        let cancel = {
            let mut inner = self.inner.lock();
            if let Some(status) = inner.session.status {
                if !status.is_terminal() {
                    return Err(RestoreError::invalid_state(format!(
                        "Cannot start an upload that is {status}"
                    )));
                }
            }
            if let Err(err) = self.store.remove(&inner.session.storage_key) {
                log::warn!("Could not clear resume record of {}: {}", self.source.file_name, err);
            }
            inner.session =
                UploadSession::new(&self.source, self.metadata.clone(), self.opts.chunk_size);
            inner.cancel = CancellationToken::new();
            self.set_status(&mut inner, UploadStatus::Initializing)?;
            inner.cancel.clone()
        };

        log::info!(
            "Starting upload of {:?} ({} bytes)",
            self.source.path,
            self.source.file_size
        );
        let result = self.drive(&cancel, false).await;
        self.conclude(&cancel, result)
    }

    /// Stops transmission. In flight chunk requests are aborted and will be
    /// sent again on `resume`.
    pub fn pause(&self) -> Result<(), RestoreError> {
        let mut inner = self.inner.lock();
        if inner.session.status != Some(UploadStatus::Uploading) {
            return Err(RestoreError::invalid_state(format!(
                "Can only pause while uploading, upload is {}",
                status_label(inner.session.status)
            )));
        }
        inner.cancel.cancel();
        self.set_status(&mut inner, UploadStatus::Paused)?;
        self.persist(&inner);
        log::info!(
            "Paused upload {} at {} of {} chunks",
            inner.session.upload_id,
            inner.session.received_chunks.len(),
            inner.session.total_chunks
        );
        Ok(())
    }

    /// Continues a paused upload, first asking the server what it already
    /// holds. Returns like `start`.
    pub async fn resume(&self) -> Result<UploadStatus, RestoreError> {
        let cancel = {
            let mut inner = self.inner.lock();
            if inner.session.status != Some(UploadStatus::Paused) {
                return Err(RestoreError::invalid_state(format!(
                    "Can only resume a paused upload, upload is {}",
                    status_label(inner.session.status)
                )));
            }
            inner.cancel = CancellationToken::new();
            self.set_status(&mut inner, UploadStatus::Uploading)?;
            inner.cancel.clone()
        };

        log::info!("Resuming upload of {:?}", self.source.path);
        let result = self.drive(&cancel, true).await;
        self.conclude(&cancel, result)
    }

    /// Cancels everything, tells the server when it can and always ends in
    /// `aborted` with the resume record removed.
    pub async fn abort(&self) -> Result<(), RestoreError> {
        let upload_id = {
            let mut inner = self.inner.lock();
            if let Some(status) = inner.session.status {
                if status.is_terminal() {
                    return Err(RestoreError::invalid_state(format!(
                        "Cannot abort an upload that is {status}"
                    )));
                }
            }
            inner.cancel.cancel();
            self.set_status(&mut inner, UploadStatus::Aborted)?;
            if let Err(err) = self.store.remove(&inner.session.storage_key) {
                log::warn!("Could not remove resume record of {}: {}", self.source.file_name, err);
            }
            inner.session.upload_id.clone()
        };

        if !upload_id.is_empty() {
            match self.transport.abort(&upload_id).await {
                Ok(_) => log::info!("Server discarded upload {upload_id}"),
                Err(err) => log::warn!("Could not notify server of abort for {upload_id}: {err}"),
            }
        }
        Ok(())
    }

    /// Loads the record a previous run left for this file. When one is usable
    /// the upload becomes `paused` and `resume` picks it up, otherwise any
    /// stale record is removed and `false` returned.
    pub fn restore(&self) -> Result<bool, RestoreError> {
        let mut inner = self.inner.lock();
        if let Some(status) = inner.session.status {
            if !status.is_terminal() {
                return Err(RestoreError::invalid_state(format!(
                    "Cannot restore over an upload that is {status}"
                )));
            }
        }

        let key = self.source.storage_key();
        let Some(record) = self.store.get(&key)? else {
            return Ok(false);
        };

        let now = util::now_millis();
        let usable = if !record.matches(&self.source) {
            log::debug!("Resume record {key} belongs to a different file");
            false
        } else if record.is_expired(now, RESUME_RECORD_TTL) {
            log::info!(
                "Resume record for {} expired after {}s",
                record.file_name,
                record.age(now).as_secs()
            );
            false
        } else {
            !record.upload_id.is_empty()
        };
        if !usable {
            self.store.remove(&key)?;
            return Ok(false);
        }

        let mut session =
            UploadSession::new(&self.source, self.metadata.clone(), self.opts.chunk_size);
        session.adopt_record(&record);
        inner.session = session;
        inner.cancel = CancellationToken::new();
        self.set_status(&mut inner, UploadStatus::Paused)?;
        self.observer.on_progress(inner.session.progress());
        log::info!(
            "Restored upload {} with {} of {} chunks",
            record.upload_id,
            inner.session.received_chunks.len(),
            inner.session.total_chunks
        );
        Ok(true)
    }

    async fn drive(
        &self,
        cancel: &CancellationToken,
        check_status_first: bool,
    ) -> Result<FinalizeUploadResponse, RestoreError> {
        let needs_init = !self.inner.lock().session.has_upload_id();
        if needs_init {
            if check_status_first {
                self.transition(cancel, UploadStatus::Initializing)?;
            }
            self.initialize(cancel).await?;
        }

        let mut check_status_first = check_status_first && !needs_init;
        let mut resets = 0;
        loop {
            match self.transmit_and_finalize(cancel, check_status_first).await {
                Err(err) if err.is_session_not_found() && !cancel.is_cancelled() => {
                    if resets >= self.opts.max_session_resets {
                        log::error!("Server forgot the upload session {resets} times, giving up");
                        return Err(err);
                    }
                    resets += 1;
                    log::warn!("{err}, starting a new session");
                    self.reset_session(cancel)?;
                    self.initialize(cancel).await?;
                    check_status_first = false;
                }
                result => return result,
            }
        }
    }

    async fn initialize(&self, cancel: &CancellationToken) -> Result<(), RestoreError> {
        let request = {
            let inner = self.inner.lock();
            InitUploadRequest {
                file_name: inner.session.file_name.clone(),
                file_size: inner.session.file_size,
                total_chunks: inner.session.total_chunks,
                metadata: inner.session.metadata.clone(),
            }
        };

        let response = self.transport.init(&request, cancel).await?;

        {
            let mut inner = self.inner.lock();
            if !cancel.is_cancelled() {
                inner.session.adopt_init(&response);
                log::info!(
                    "Upload session {} created: {} chunks of {} bytes",
                    inner.session.upload_id,
                    inner.session.total_chunks,
                    inner.session.chunk_size
                );
                self.persist(&inner);
                self.set_status(&mut inner, UploadStatus::Uploading)?;
                self.observer.on_progress(inner.session.progress());
                return Ok(());
            }
        }

        // never adopted, so abort() did not see this id
        log::info!("Upload stopped while session {} was created", response.upload_id);
        if let Err(err) = self.transport.abort(&response.upload_id).await {
            log::warn!("Could not discard upload session {}: {err}", response.upload_id);
        }
        Err(RestoreError::operation_cancelled())
    }

    fn reset_session(&self, cancel: &CancellationToken) -> Result<(), RestoreError> {
        let mut inner = self.inner.lock();
        if cancel.is_cancelled() {
            return Err(RestoreError::operation_cancelled());
        }
        if let Err(err) = self.store.remove(&inner.session.storage_key) {
            log::warn!("Could not clear resume record of {}: {}", self.source.file_name, err);
        }
        inner.session.reset_for_new_session();
        self.set_status(&mut inner, UploadStatus::Initializing)?;
        Ok(())
    }

    async fn transmit_and_finalize(
        &self,
        cancel: &CancellationToken,
        check_status_first: bool,
    ) -> Result<FinalizeUploadResponse, RestoreError> {
        if check_status_first {
            self.reconcile(cancel).await?;
        }

        let max_passes = self.opts.max_reconcile_passes.max(1);
        let mut passes = 0;
        loop {
            let pending = self.inner.lock().session.pending_chunks();
            if pending.is_empty() {
                break;
            }
            if passes >= max_passes {
                let inner = self.inner.lock();
                return Err(RestoreError::incomplete_upload(
                    inner.session.received_chunks.len(),
                    inner.session.total_chunks,
                ));
            }
            passes += 1;
            log::debug!("Transmission pass {passes}: {} chunks pending", pending.len());

            self.transmit(pending, cancel).await?;
            sleep_or_cancel(self.opts.status_settle_delay, cancel).await?;
            self.reconcile(cancel).await?;
        }

        self.finalize(cancel).await
    }

    /// Sends `pending` with at most `max_concurrent_uploads` in flight. A new
    /// chunk starts as soon as any slot frees up. Stops at the first chunk that
    /// fails for good, dropping the requests still in flight.
    async fn transmit(
        &self,
        pending: Vec<u64>,
        cancel: &CancellationToken,
    ) -> Result<(), RestoreError> {
        let mut uploads = stream::iter(pending)
            .map(|index| async move {
                let response = self.upload_chunk_with_retry(index, cancel).await?;
                Ok::<_, RestoreError>((index, response))
            })
            .buffer_unordered(self.opts.max_concurrent_uploads.max(1));

        while let Some(result) = uploads.next().await {
            let (index, response) = result?;
            self.record_ack(index, &response, cancel)?;
        }
        Ok(())
    }

    async fn upload_chunk_with_retry(
        &self,
        index: u64,
        cancel: &CancellationToken,
    ) -> Result<ChunkUploadResponse, RestoreError> {
        let (upload_id, total_chunks, (offset, len)) = {
            let inner = self.inner.lock();
            (
                inner.session.upload_id.clone(),
                inner.session.total_chunks,
                inner.session.chunk_range(index),
            )
        };

        let chunk = self.source.read_chunk(offset, len).await?;
        let checksum = util::hasher::chunk_checksum(chunk.clone()).await?;

        let mut retries = 0;
        loop {
            let result = self
                .transport
                .upload_chunk(
                    &upload_id,
                    index,
                    total_chunks,
                    chunk.clone(),
                    &checksum,
                    cancel,
                )
                .await;
            let err = match result {
                Ok(response) => return Ok(response),
                Err(_) if cancel.is_cancelled() => return Err(RestoreError::operation_cancelled()),
                Err(err) if !is_retryable(&err) => return Err(err),
                Err(err) => err,
            };

            if retries >= self.opts.max_retries {
                log::error!("Chunk {index} of {upload_id} failed for good: {err}");
                return Err(RestoreError::retries_exhausted(index, retries, &err));
            }
            let wait = exponential_backoff(self.opts.base_wait, retries);
            retries += 1;
            log::warn!(
                "Chunk {index} of {upload_id} failed ({err}), retry {retries}/{} in {:?}",
                self.opts.max_retries,
                wait
            );
            sleep_or_cancel(wait, cancel).await?;
        }
    }

    fn record_ack(
        &self,
        index: u64,
        response: &ChunkUploadResponse,
        cancel: &CancellationToken,
    ) -> Result<(), RestoreError> {
        let mut inner = self.inner.lock();
        // pause or abort won the race, the acknowledgement is not wanted
        if cancel.is_cancelled() {
            return Err(RestoreError::operation_cancelled());
        }
        inner
            .session
            .record_ack(index, response.received_chunks.as_ref(), response.progress);
        self.persist(&inner);

        let received = inner.session.received_chunks.len() as u64;
        let total = inner.session.total_chunks;
        log::debug!("Chunk {index} acknowledged, {received}/{total}");
        self.observer.on_chunk_complete(index, received, total);
        self.observer.on_progress(inner.session.progress());
        Ok(())
    }

    /// Polls the server and adopts its view of the received chunks. Only a
    /// forgotten session or cancellation stops the upload here.
    async fn reconcile(&self, cancel: &CancellationToken) -> Result<(), RestoreError> {
        let upload_id = self.inner.lock().session.upload_id.clone();
        match self.transport.status(&upload_id, cancel).await {
            Ok(status) => {
                let mut inner = self.inner.lock();
                if cancel.is_cancelled() {
                    return Err(RestoreError::operation_cancelled());
                }
                inner.session.merge_status(&status);
                self.persist(&inner);
                self.observer.on_progress(inner.session.progress());
                Ok(())
            }
            Err(err) if !is_retryable(&err) => Err(err),
            Err(err) => {
                log::warn!("Could not check status of upload {upload_id}: {err}");
                Ok(())
            }
        }
    }

    async fn finalize(
        &self,
        cancel: &CancellationToken,
    ) -> Result<FinalizeUploadResponse, RestoreError> {
        let request = {
            let mut inner = self.inner.lock();
            if cancel.is_cancelled() {
                return Err(RestoreError::operation_cancelled());
            }
            if !inner.session.is_complete() {
                let received = inner.session.received_chunks.len();
                let total = inner.session.total_chunks;
                log::error!("Refusing to finalize with {received} of {total} chunks");
                return Err(RestoreError::incomplete_upload(received, total));
            }
            self.set_status(&mut inner, UploadStatus::Finalizing)?;
            FinalizeUploadRequest {
                upload_id: inner.session.upload_id.clone(),
                file_name: inner.session.file_name.clone(),
                file_size: inner.session.file_size,
                metadata: inner.session.metadata.clone(),
            }
        };

        log::info!("Finalizing upload {}", request.upload_id);
        self.transport.finalize(&request, cancel).await
    }

    /// Turns the outcome of a run into the final status and callbacks
    fn conclude(
        &self,
        cancel: &CancellationToken,
        result: Result<FinalizeUploadResponse, RestoreError>,
    ) -> Result<UploadStatus, RestoreError> {
        let mut inner = self.inner.lock();
        let current = inner.session.status;

        if cancel.is_cancelled() {
            // pause or abort already moved the status
            let status = current.unwrap_or(UploadStatus::Aborted);
            log::debug!("Upload run stopped, upload is {status}");
            return Ok(status);
        }

        match result {
            Ok(response) => {
                if let Err(err) = self.store.remove(&inner.session.storage_key) {
                    log::warn!("Could not remove resume record of {}: {}", self.source.file_name, err);
                }
                self.set_status(&mut inner, UploadStatus::Completed)?;
                self.observer.on_progress(100);
                self.observer.on_complete(&response);
                log::info!(
                    "Upload {} of {} completed",
                    inner.session.upload_id,
                    inner.session.file_name
                );
                Ok(UploadStatus::Completed)
            }
            Err(err) if err.is_cancelled() => Ok(current.unwrap_or(UploadStatus::Aborted)),
            Err(err) => {
                log::error!("Upload of {} failed: {}", self.source.file_name, err);
                self.persist(&inner);
                if let Err(status_err) = self.set_status(&mut inner, UploadStatus::Error) {
                    log::debug!("{status_err}");
                }
                self.observer.on_error(&err);
                Err(err)
            }
        }
    }

    /// Status change from inside a run, refused once the run was cancelled
    fn transition(
        &self,
        cancel: &CancellationToken,
        next: UploadStatus,
    ) -> Result<(), RestoreError> {
        let mut inner = self.inner.lock();
        if cancel.is_cancelled() {
            return Err(RestoreError::operation_cancelled());
        }
        self.set_status(&mut inner, next)
    }

    fn set_status(&self, inner: &mut Inner, next: UploadStatus) -> Result<(), RestoreError> {
        if let Some(current) = inner.session.status {
            if current == next {
                return Ok(());
            }
            if !current.can_transition_to(next) {
                return Err(RestoreError::invalid_state(format!(
                    "Cannot go from {current} to {next}"
                )));
            }
        }
        log::debug!("Upload of {} is now {next}", self.source.file_name);
        inner.session.status = Some(next);
        self.observer.on_status_change(next);
        Ok(())
    }

    /// Writes the resume record, unless the upload was aborted
    fn persist(&self, inner: &Inner) {
        if inner.session.status == Some(UploadStatus::Aborted) || !inner.session.has_upload_id() {
            return;
        }
        let record = inner.session.to_record(util::now_millis());
        if let Err(err) = self.store.put(&inner.session.storage_key, &record) {
            log::warn!("Could not save resume record of {}: {}", self.source.file_name, err);
        }
    }
}

fn status_label(status: Option<UploadStatus>) -> String {
    status
        .map(|status| status.to_string())
        .unwrap_or_else(|| "not started".to_string())
}

/// Records of uploads that can still be resumed, newest first. Expired
/// records are removed along the way.
pub fn list_resumable(store: &dyn ResumeStore) -> Result<Vec<(String, ResumeRecord)>, RestoreError> {
    let now = util::now_millis();
    let mut resumable = vec![];
    for (key, record) in store.list()? {
        if record.is_expired(now, RESUME_RECORD_TTL) {
            log::debug!("Removing expired resume record {key}");
            store.remove(&key)?;
        } else {
            resumable.push((key, record));
        }
    }
    Ok(resumable)
}
