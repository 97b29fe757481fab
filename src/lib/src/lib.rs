//! 🗄️ librestoredb
//!
//! Resumable chunked uploads of database backups to a RestoreDB server.
//!
//! # Examples
//!
//! Uploading a backup file end to end:
//!
//! ```ignore
//! use std::sync::Arc;
//! use librestoredb::api::client::large_uploads::HttpTransport;
//! use librestoredb::config::ApiConfig;
//! use librestoredb::model::UploadSource;
//! use librestoredb::opts::UploadOpts;
//! use librestoredb::storage::LocalResumeStore;
//! use librestoredb::uploader::{ChunkedUploader, NoopObserver};
//!
//! let config = ApiConfig::get()?;
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let store = Arc::new(LocalResumeStore::default_location()?);
//! let source = UploadSource::from_path("nightly.fbk")?;
//! let uploader = ChunkedUploader::new(
//!     source,
//!     Default::default(),
//!     UploadOpts::default(),
//!     transport,
//!     store,
//!     Arc::new(NoopObserver),
//! );
//! let status = uploader.start().await?;
//! ```
//!
//! Continuing an upload that was interrupted by a restart:
//!
//! ```ignore
//! if uploader.restore()? {
//!     uploader.resume().await?;
//! }
//! ```

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod opts;
pub mod storage;
pub mod uploader;
pub mod util;
pub mod view;
