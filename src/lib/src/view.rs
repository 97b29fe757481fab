//! Views are the shapes of the JSON bodies exchanged with the RestoreDB server
//!

pub mod large_upload;

pub use large_upload::{
    AbortUploadRequest, AbortUploadResponse, ChunkUploadResponse, ErrorResponse,
    FinalizeUploadRequest, FinalizeUploadResponse, InitUploadRequest, InitUploadResponse,
    ReceivedChunks, UploadStatusResponse,
};
