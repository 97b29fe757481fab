use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use colored::Colorize;
use indicatif::ProgressBar;

use librestoredb::error::RestoreError;
use librestoredb::model::UploadStatus;
use librestoredb::uploader::UploadObserver;
use librestoredb::util::progress_bar::{restoredb_progress_bar, ProgressBarType};
use librestoredb::view::FinalizeUploadResponse;

use crate::helpers;

const NO_BASELINE: u64 = u64::MAX;

/// Draws the upload on the terminal with speed and time left
pub struct ProgressReporter {
    bar: Arc<ProgressBar>,
    file_size: u64,
    started: Instant,
    // chunks the server already held when this run started
    baseline: AtomicU64,
}

impl ProgressReporter {
    pub fn new(file_size: u64) -> ProgressReporter {
        ProgressReporter {
            bar: restoredb_progress_bar(100, ProgressBarType::Percent),
            file_size,
            started: Instant::now(),
            baseline: AtomicU64::new(NO_BASELINE),
        }
    }

    fn bytes_for(&self, chunks: u64, total: u64) -> u64 {
        if total == 0 {
            return 0;
        }
        (self.file_size as u128 * chunks as u128 / total as u128) as u64
    }
}

impl UploadObserver for ProgressReporter {
    fn on_progress(&self, progress: u8) {
        self.bar.set_position(progress as u64);
    }

    fn on_chunk_complete(&self, _chunk_index: u64, received: u64, total: u64) {
        // the first acknowledgement of a run sets the baseline
        let _ = self.baseline.compare_exchange(
            NO_BASELINE,
            received.saturating_sub(1),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        let baseline = self.baseline.load(Ordering::SeqCst);
        let sent = self.bytes_for(received.saturating_sub(baseline), total);
        let remaining = self
            .file_size
            .saturating_sub(self.bytes_for(received, total));

        let elapsed = self.started.elapsed().as_secs_f64();
        let speed = if elapsed > 0.0 {
            sent as f64 / elapsed
        } else {
            0.0
        };
        let eta = helpers::estimate_remaining(remaining, speed);
        self.bar.set_message(format!(
            "{received}/{total} chunks  {}  ETA {}",
            helpers::format_speed(speed),
            helpers::format_eta(eta)
        ));
    }

    fn on_complete(&self, response: &FinalizeUploadResponse) {
        self.bar.finish_with_message("done".green().to_string());
        let message = response
            .message
            .clone()
            .unwrap_or_else(|| "Upload complete".to_string());
        println!("{}", message.green());
        if let Some(file_id) = &response.processed_file_id {
            println!("Processed file id: {}", file_id.bold());
        }
    }

    fn on_error(&self, error: &RestoreError) {
        self.bar.abandon_with_message("failed".red().to_string());
        eprintln!("{}", error.to_string().red());
    }

    fn on_status_change(&self, status: UploadStatus) {
        match status {
            UploadStatus::Paused => self
                .bar
                .abandon_with_message("paused, continue with `restoredb upload --resume`".yellow().to_string()),
            UploadStatus::Aborted => self.bar.abandon_with_message("aborted".red().to_string()),
            UploadStatus::Initializing | UploadStatus::Finalizing => {
                self.bar.set_message(status.to_string())
            }
            _ => {}
        }
    }
}
