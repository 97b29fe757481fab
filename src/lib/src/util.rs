//! Various utility functions
//!

pub mod fs;
pub mod hasher;
pub mod logging;
pub mod progress_bar;

/// Epoch milliseconds, the timestamp format of resumability records
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
