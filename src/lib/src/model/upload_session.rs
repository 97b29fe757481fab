use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ResumeRecord, UploadSource, UploadStatus};
use crate::view::large_upload::progress_percent;
use crate::view::{InitUploadResponse, ReceivedChunks, UploadStatusResponse};

/// Free-form key/value pairs sent on init and finalize
pub type UploadMetadata = BTreeMap<String, String>;

/// In-memory state of one chunked upload.
///
/// `received_chunks` only ever holds indices in `0..total_chunks`, and only
/// after the server acknowledged them.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Empty until the server assigns one
    pub upload_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub chunk_size: u64,
    pub total_chunks: u64,
    pub received_chunks: BTreeSet<u64>,
    pub metadata: UploadMetadata,
    /// `None` until `start` or `restore` runs
    pub status: Option<UploadStatus>,
    pub storage_key: String,
    /// Last percentage the server reported, if any
    pub server_progress: Option<f64>,
    requested_chunk_size: u64,
}

pub fn total_chunks_for(file_size: u64, chunk_size: u64) -> u64 {
    file_size.div_ceil(chunk_size.max(1))
}

impl UploadSession {
    pub fn new(source: &UploadSource, metadata: UploadMetadata, chunk_size: u64) -> UploadSession {
        let chunk_size = chunk_size.max(1);
        UploadSession {
            upload_id: String::new(),
            file_name: source.file_name.clone(),
            file_size: source.file_size,
            chunk_size,
            total_chunks: total_chunks_for(source.file_size, chunk_size),
            received_chunks: BTreeSet::new(),
            metadata,
            status: None,
            storage_key: source.storage_key(),
            server_progress: None,
            requested_chunk_size: chunk_size,
        }
    }

    pub fn has_upload_id(&self) -> bool {
        !self.upload_id.is_empty()
    }

    /// Adopt the id and chunk geometry the server chose on init. A chunk count
    /// from the server wins over the one derived from the chunk size.
    pub fn adopt_init(&mut self, response: &InitUploadResponse) {
        self.upload_id = response.upload_id.clone();
        if let Some(chunk_size) = response.chunk_size.filter(|size| *size > 0) {
            self.chunk_size = chunk_size;
        }
        let derived = total_chunks_for(self.file_size, self.chunk_size);
        self.total_chunks = match response.total_chunks.filter(|total| *total > 0) {
            Some(server_total) => {
                if server_total != derived {
                    log::warn!(
                        "Server expects {server_total} chunks for {} where chunk size {} gives {derived}",
                        self.file_name,
                        self.chunk_size
                    );
                }
                server_total
            }
            None => derived,
        };
    }

    /// Adopt a record written by a previous run for this same file
    pub fn adopt_record(&mut self, record: &ResumeRecord) {
        self.upload_id = record.upload_id.clone();
        if let Some(chunk_size) = record.chunk_size.filter(|size| *size > 0) {
            self.chunk_size = chunk_size;
        }
        self.total_chunks = if record.total_chunks > 0 {
            record.total_chunks
        } else {
            total_chunks_for(self.file_size, self.chunk_size)
        };
        self.received_chunks = record
            .received_chunks
            .iter()
            .copied()
            .filter(|index| *index < self.total_chunks)
            .collect();
        self.server_progress = None;
    }

    /// Forget everything tied to a session the server no longer knows. This
    /// is the one place `received_chunks` shrinks, the next init starts a
    /// session which holds no chunks.
    pub fn reset_for_new_session(&mut self) {
        self.upload_id.clear();
        self.received_chunks.clear();
        self.server_progress = None;
        self.chunk_size = self.requested_chunk_size;
        self.total_chunks = total_chunks_for(self.file_size, self.chunk_size);
    }

    /// Byte offset and length of a chunk, the last one may be short
    pub fn chunk_range(&self, index: u64) -> (u64, u64) {
        let offset = index.saturating_mul(self.chunk_size).min(self.file_size);
        let len = self.chunk_size.min(self.file_size - offset);
        (offset, len)
    }

    /// Indices not yet acknowledged, ascending
    pub fn pending_chunks(&self) -> Vec<u64> {
        (0..self.total_chunks)
            .filter(|index| !self.received_chunks.contains(index))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.received_chunks.len() as u64 == self.total_chunks
    }

    /// Record the acknowledgement of chunk `index`.
    ///
    /// When the server lists every index it holds, the local set becomes the
    /// union of both. A bare count says nothing about which chunks, so only
    /// the acknowledged index is added.
    pub fn record_ack(
        &mut self,
        index: u64,
        received: Option<&ReceivedChunks>,
        progress: Option<f64>,
    ) {
        if let Some(ReceivedChunks::Indices(indices)) = received {
            self.merge_indices(indices);
        }
        if index < self.total_chunks {
            self.received_chunks.insert(index);
        }
        if progress.is_some() {
            self.server_progress = progress;
        }
    }

    /// Merge the server's view from a status poll. A list of indices is
    /// added to the local set, nothing acknowledged before is dropped.
    pub fn merge_status(&mut self, status: &UploadStatusResponse) {
        match &status.received_chunks {
            Some(ReceivedChunks::Indices(indices)) => {
                let missing = self
                    .received_chunks
                    .iter()
                    .filter(|index| !indices.contains(*index))
                    .count();
                if missing > 0 {
                    log::warn!(
                        "Status of {} leaves out {missing} acknowledged chunks",
                        self.upload_id
                    );
                }
                self.merge_indices(indices);
            }
            Some(ReceivedChunks::Count(count)) => {
                log::debug!(
                    "Status for {} only reports a count of {count} received chunks",
                    self.upload_id
                );
            }
            None => {}
        }
        if status.progress.is_some() {
            self.server_progress = status.progress;
        }
    }

    fn merge_indices(&mut self, indices: &[u64]) {
        for index in indices {
            if *index < self.total_chunks {
                self.received_chunks.insert(*index);
            } else {
                log::warn!(
                    "Ignoring chunk index {index} outside 0..{} for {}",
                    self.total_chunks,
                    self.upload_id
                );
            }
        }
    }

    /// Percentage in 0..=100, preferring the server's own figure
    pub fn progress(&self) -> u8 {
        if let Some(progress) = self.server_progress {
            return progress_percent(progress);
        }
        if self.total_chunks == 0 {
            return 0;
        }
        progress_percent(self.received_chunks.len() as f64 * 100.0 / self.total_chunks as f64)
    }

    pub fn to_record(&self, timestamp: i64) -> ResumeRecord {
        ResumeRecord {
            upload_id: self.upload_id.clone(),
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            total_chunks: self.total_chunks,
            received_chunks: self.received_chunks.iter().copied().collect(),
            timestamp,
            chunk_size: Some(self.chunk_size),
        }
    }
}
