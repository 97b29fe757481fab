pub mod upload_opts;

pub use crate::opts::upload_opts::UploadOpts;
