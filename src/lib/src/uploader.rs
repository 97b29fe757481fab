//! # Uploader - resumable chunked uploads of one file
//!

pub mod chunked_uploader;
pub mod observer;
pub mod retry;
pub mod transport;

pub use chunked_uploader::{list_resumable, ChunkedUploader};
pub use observer::{NoopObserver, UploadObserver};
pub use transport::{cancellable, ChunkTransport};
