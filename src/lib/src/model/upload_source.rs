use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::constants::RESUME_RECORD_PREFIX;
use crate::error::RestoreError;

/// The local file being uploaded, with the identity used to key its
/// resumability record.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSource {
    pub path: PathBuf,
    pub file_name: String,
    pub file_size: u64,
    /// Epoch milliseconds
    pub last_modified: i64,
}

impl UploadSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<UploadSource, RestoreError> {
        let path = path.as_ref();
        let Ok(metadata) = path.metadata() else {
            return Err(RestoreError::path_does_not_exist(path));
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| RestoreError::file_has_no_name(path))?
            .to_string_lossy()
            .to_string();
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Ok(UploadSource {
            path: path.to_path_buf(),
            file_name,
            file_size: metadata.len(),
            last_modified,
        })
    }

    /// Same file name, size and modification time always produce the same key
    pub fn storage_key(&self) -> String {
        format!(
            "{RESUME_RECORD_PREFIX}_{}_{}_{}",
            self.file_name, self.file_size, self.last_modified
        )
    }

    /// Reads `len` bytes starting at `offset`, fewer at the end of the file.
    pub async fn read_chunk(&self, offset: u64, len: u64) -> Result<Bytes, RestoreError> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        let len = len.min(self.file_size.saturating_sub(offset));
        let mut buffer = Vec::with_capacity(len as usize);
        file.take(len).read_to_end(&mut buffer).await?;
        if (buffer.len() as u64) < len {
            return Err(RestoreError::basic_str(format!(
                "File {:?} shrank while uploading: wanted {len} bytes at offset {offset}, read {}",
                self.path,
                buffer.len()
            )));
        }
        Ok(Bytes::from(buffer))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RestoreError;
    use crate::model::UploadSource;
    use crate::test;

    #[tokio::test]
    async fn test_read_chunk_clamps_at_end_of_file() -> Result<(), RestoreError> {
        let dir = tempfile::tempdir()?;
        let path = test::write_patterned_file(dir.path(), "nightly.fbk", 10)?;
        let source = UploadSource::from_path(&path)?;
        assert_eq!(source.file_size, 10);
        assert_eq!(source.file_name, "nightly.fbk");

        let head = source.read_chunk(0, 4).await?;
        assert_eq!(&head[..], &[0, 1, 2, 3]);

        let tail = source.read_chunk(8, 4).await?;
        assert_eq!(&tail[..], &[8, 9]);
        Ok(())
    }

    #[test]
    fn test_storage_key_tracks_file_identity() -> Result<(), RestoreError> {
        let dir = tempfile::tempdir()?;
        let path = test::write_patterned_file(dir.path(), "client.gbk", 3)?;
        let source = UploadSource::from_path(&path)?;

        let key = source.storage_key();
        assert!(key.starts_with("chunked_upload_client.gbk_3_"));
        assert_eq!(key, UploadSource::from_path(&path)?.storage_key());

        let mut touched = source.clone();
        touched.last_modified += 1;
        assert_ne!(key, touched.storage_key());
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let result = UploadSource::from_path("/definitely/not/here.fbk");
        assert!(matches!(result, Err(RestoreError::PathDoesNotExist(_))));
    }
}
