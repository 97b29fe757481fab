use std::time::Duration;

pub const RESTOREDB_VERSION: &str = env!("CARGO_PKG_VERSION");

// Config
pub const CONFIG_DIR: &str = "restoredb";
pub const DEFAULT_HOST: &str = "http://localhost:8080";
pub const HOST_ENV_VAR: &str = "RESTOREDB_HOST";
pub const API_KEY_ENV_VAR: &str = "RESTOREDB_API_KEY";
pub const API_KEY_HEADER: &str = "X-API-Key";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

// Large upload endpoints
pub const LARGE_UPLOAD_INIT_PATH: &str = "/api/upload/large/init";
pub const LARGE_UPLOAD_CHUNK_PATH: &str = "/api/upload/large/chunk";
pub const LARGE_UPLOAD_STATUS_PATH: &str = "/api/upload/large/status";
pub const LARGE_UPLOAD_FINALIZE_PATH: &str = "/api/upload/large/finalize";
pub const LARGE_UPLOAD_ABORT_PATH: &str = "/api/upload/large/abort";

// Uploader defaults
pub const DEFAULT_CHUNK_SIZE: u64 = 25 * 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 3;
pub const DEFAULT_MAX_RETRIES: usize = 5;
pub const DEFAULT_BASE_WAIT: Duration = Duration::from_secs(2);
pub const DEFAULT_STATUS_SETTLE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_SESSION_RESETS: usize = 3;
pub const DEFAULT_MAX_RECONCILE_PASSES: usize = 2;

// Resumability records
pub const RESUME_RECORDS_DIR: &str = "uploads";
pub const RESUME_RECORD_PREFIX: &str = "chunked_upload";
pub const RESUME_RECORD_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// Backup files the server knows how to restore
pub const ACCEPTED_BACKUP_EXTENSIONS: [&str; 3] = ["fbk", "gbk", "bt"];

// Metadata keys understood by the server
pub const METADATA_CLIENT_NAME: &str = "clienteNome";
pub const METADATA_TICKET_ID: &str = "ticketID";
pub const METADATA_NOTES: &str = "notasTecnico";
