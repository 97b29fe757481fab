//! Core data structures of an upload
//!

pub mod resume_record;
pub mod upload_session;
pub mod upload_source;
pub mod upload_status;

pub use crate::model::resume_record::ResumeRecord;
pub use crate::model::upload_session::{UploadMetadata, UploadSession};
pub use crate::model::upload_source::UploadSource;
pub use crate::model::upload_status::UploadStatus;
