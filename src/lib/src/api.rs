//! # API - talking to a RestoreDB server over HTTP
//!

pub mod client;
pub mod endpoint;
