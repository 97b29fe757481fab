//! Configuration for restoredb: which server to talk to and how to authenticate
//!

pub mod api_config;

pub use crate::config::api_config::ApiConfig;
pub use crate::config::api_config::API_CONFIG_FILENAME;
