use std::time::Duration;

use crate::constants;

/// Tuning knobs for a `ChunkedUploader`
#[derive(Clone, Debug)]
pub struct UploadOpts {
    /// Requested bytes per chunk, the server may override it on init
    pub chunk_size: u64,
    /// Chunk round-trips allowed in flight at once
    pub max_concurrent_uploads: usize,
    /// Retries per chunk after the first failed attempt
    pub max_retries: usize,
    /// First backoff delay, doubled on every retry
    pub base_wait: Duration,
    /// Pause between the end of a transmission pass and the status poll
    pub status_settle_delay: Duration,
    /// Automatic re-inits allowed when the server forgets the session
    pub max_session_resets: usize,
    /// Transmission passes allowed before giving up on missing chunks
    pub max_reconcile_passes: usize,
}

impl Default for UploadOpts {
    fn default() -> Self {
        UploadOpts {
            chunk_size: constants::DEFAULT_CHUNK_SIZE,
            max_concurrent_uploads: constants::DEFAULT_MAX_CONCURRENT_UPLOADS,
            max_retries: constants::DEFAULT_MAX_RETRIES,
            base_wait: constants::DEFAULT_BASE_WAIT,
            status_settle_delay: constants::DEFAULT_STATUS_SETTLE_DELAY,
            max_session_resets: constants::DEFAULT_MAX_SESSION_RESETS,
            max_reconcile_passes: constants::DEFAULT_MAX_RECONCILE_PASSES,
        }
    }
}

impl UploadOpts {
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_concurrent_uploads(mut self, max: usize) -> Self {
        self.max_concurrent_uploads = max.max(1);
        self
    }

    pub fn with_base_wait(mut self, base_wait: Duration) -> Self {
        self.base_wait = base_wait;
        self
    }

    pub fn with_status_settle_delay(mut self, delay: Duration) -> Self {
        self.status_settle_delay = delay;
        self
    }
}
