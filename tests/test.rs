// End to end uploads over HTTP against a mock RestoreDB server

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, ServerGuard};

use librestoredb::api::client::large_uploads::HttpTransport;
use librestoredb::config::ApiConfig;
use librestoredb::error::RestoreError;
use librestoredb::model::{ResumeRecord, UploadMetadata, UploadSource, UploadStatus};
use librestoredb::opts::UploadOpts;
use librestoredb::storage::{LocalResumeStore, ResumeStore};
use librestoredb::test;
use librestoredb::uploader::{ChunkedUploader, UploadObserver};
use librestoredb::util;

const INIT: &str = "/api/upload/large/init";
const CHUNK: &str = "/api/upload/large/chunk";
const STATUS: &str = "/api/upload/large/status";
const FINALIZE: &str = "/api/upload/large/finalize";
const ABORT: &str = "/api/upload/large/abort";

fn fast_opts() -> UploadOpts {
    UploadOpts::default()
        .with_chunk_size(1024)
        .with_base_wait(Duration::from_millis(10))
        .with_status_settle_delay(Duration::from_millis(10))
}

fn uploader(
    server: &ServerGuard,
    source: UploadSource,
    metadata: UploadMetadata,
    store: Arc<LocalResumeStore>,
    observer: Arc<dyn UploadObserver>,
) -> Result<ChunkedUploader, RestoreError> {
    let config = ApiConfig::new(server.url(), Some("it-key".to_string()));
    let transport = Arc::new(HttpTransport::new(&config)?);
    Ok(ChunkedUploader::new(
        source,
        metadata,
        fast_opts(),
        transport,
        store,
        observer,
    ))
}

fn record_for(source: &UploadSource, upload_id: &str, total_chunks: u64, received: Vec<u64>) -> ResumeRecord {
    ResumeRecord {
        upload_id: upload_id.to_string(),
        file_name: source.file_name.clone(),
        file_size: source.file_size,
        total_chunks,
        received_chunks: received,
        timestamp: util::now_millis(),
        chunk_size: Some(1024),
    }
}

#[tokio::test]
async fn test_upload_backup_end_to_end() -> Result<(), RestoreError> {
    test::init_test_env();
    let dir = tempfile::tempdir()?;
    let path = test::write_patterned_file(dir.path(), "loja.fbk", 3 * 1024 - 100)?;
    let store = Arc::new(LocalResumeStore::new(dir.path().join("records")));
    let observer = Arc::new(test::RecordingObserver::new());
    let mut metadata = UploadMetadata::new();
    metadata.insert("clienteNome".to_string(), "Loja 12".to_string());

    let mut server = mockito::Server::new_async().await;
    let init = server
        .mock("POST", INIT)
        .match_header("x-api-key", "it-key")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "fileName": "loja.fbk",
            "fileSize": 3 * 1024 - 100,
            "totalChunks": 3,
            "metadata": {"clienteNome": "Loja 12"}
        })))
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"upload_id": "it-1", "uploadId": "it-1", "chunk_size": 1024, "chunkSize": 1024, "totalChunks": 3}"#,
        )
        .create_async()
        .await;
    let chunks = server
        .mock("POST", CHUNK)
        .match_header("x-api-key", "it-key")
        .match_body(Matcher::Regex(r#"name="uploadId"\r\n\r\nit-1"#.to_string()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": true}"#)
        .expect(3)
        .create_async()
        .await;
    let status = server
        .mock("GET", STATUS)
        .match_query(Matcher::UrlEncoded("uploadId".into(), "it-1".into()))
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"uploadId": "it-1", "received_chunks": [0, 1, 2], "receivedChunks": [0, 1, 2], "totalChunks": 3, "progress": 100}"#,
        )
        .create_async()
        .await;
    let finalize = server
        .mock("POST", FINALIZE)
        .match_body(Matcher::PartialJson(serde_json::json!({
            "uploadId": "it-1",
            "fileName": "loja.fbk",
            "fileSize": 3 * 1024 - 100
        })))
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "File assembled", "processedFileId": "bk-77"}"#)
        .expect(1)
        .create_async()
        .await;

    let source = UploadSource::from_path(&path)?;
    let key = source.storage_key();
    let uploader = uploader(&server, source, metadata, store.clone(), observer.clone())?;
    assert_eq!(uploader.start().await?, UploadStatus::Completed);

    init.assert_async().await;
    chunks.assert_async().await;
    status.assert_async().await;
    finalize.assert_async().await;
    assert!(store.get(&key)?.is_none());
    assert!(observer
        .events()
        .contains(&test::UploadEvent::Complete(Some("bk-77".to_string()))));
    Ok(())
}

#[tokio::test]
async fn test_resume_after_restart_when_server_forgot_session() -> Result<(), RestoreError> {
    let dir = tempfile::tempdir()?;
    let path = test::write_patterned_file(dir.path(), "erp.gbk", 2 * 1024)?;
    let store = Arc::new(LocalResumeStore::new(dir.path().join("records")));
    let source = UploadSource::from_path(&path)?;
    store.put(&source.storage_key(), &record_for(&source, "gone", 2, vec![0]))?;

    let mut server = mockito::Server::new_async().await;
    let forgotten = server
        .mock("GET", STATUS)
        .match_query(Matcher::UrlEncoded("uploadId".into(), "gone".into()))
        .with_status(404)
        .with_body(r#"{"error": "Upload not found"}"#)
        .create_async()
        .await;
    let init = server
        .mock("POST", INIT)
        .with_header("content-type", "application/json")
        .with_body(r#"{"uploadId": "it-2"}"#)
        .expect(1)
        .create_async()
        .await;
    let chunks = server
        .mock("POST", CHUNK)
        .match_body(Matcher::Regex(r#"name="uploadId"\r\n\r\nit-2"#.to_string()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"receivedChunks": 1}"#)
        .expect(2)
        .create_async()
        .await;
    let status = server
        .mock("GET", STATUS)
        .match_query(Matcher::UrlEncoded("uploadId".into(), "it-2".into()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"received_chunks": [0, 1], "total_chunks": 2}"#)
        .create_async()
        .await;
    let finalize = server
        .mock("POST", FINALIZE)
        .match_body(Matcher::PartialJson(serde_json::json!({"uploadId": "it-2"})))
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "ok"}"#)
        .expect(1)
        .create_async()
        .await;

    let uploader = uploader(
        &server,
        source,
        UploadMetadata::new(),
        store.clone(),
        Arc::new(test::RecordingObserver::new()),
    )?;
    assert!(uploader.restore()?);
    assert_eq!(uploader.resume().await?, UploadStatus::Completed);

    forgotten.assert_async().await;
    init.assert_async().await;
    chunks.assert_async().await;
    status.assert_async().await;
    finalize.assert_async().await;
    assert!(store.list()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_abort_clears_record_when_server_fails() -> Result<(), RestoreError> {
    let dir = tempfile::tempdir()?;
    let path = test::write_patterned_file(dir.path(), "fiscal.bt", 1024)?;
    let store = Arc::new(LocalResumeStore::new(dir.path().join("records")));
    let source = UploadSource::from_path(&path)?;
    let key = source.storage_key();
    store.put(&key, &record_for(&source, "it-3", 1, vec![]))?;

    let mut server = mockito::Server::new_async().await;
    let abort = server
        .mock("POST", ABORT)
        .match_body(Matcher::PartialJson(serde_json::json!({"uploadId": "it-3"})))
        .with_status(500)
        .with_body("database is down")
        .expect(1)
        .create_async()
        .await;

    let uploader = uploader(
        &server,
        source,
        UploadMetadata::new(),
        store.clone(),
        Arc::new(test::RecordingObserver::new()),
    )?;
    assert!(uploader.restore()?);
    uploader.abort().await?;

    abort.assert_async().await;
    assert_eq!(uploader.status(), Some(UploadStatus::Aborted));
    assert!(store.get(&key)?.is_none());
    Ok(())
}
