use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::error::RestoreError;

/// Hex encoded SHA-256 of a buffer. Always 64 characters.
pub fn hash_buffer_sha256(buffer: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(buffer);
    hex::encode(hasher.finalize())
}

/// Checksum sent alongside each chunk so the server can verify the transfer.
///
/// Chunks can be tens of megabytes, so the digest runs on the blocking pool
/// and other chunks keep making progress while it computes.
pub async fn chunk_checksum(chunk: Bytes) -> Result<String, RestoreError> {
    let checksum = tokio::task::spawn_blocking(move || hash_buffer_sha256(&chunk)).await?;
    Ok(checksum)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::error::RestoreError;
    use crate::util::hasher;

    #[test]
    fn test_hash_buffer_sha256_known_value() {
        assert_eq!(
            hasher::hash_buffer_sha256(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_chunk_checksum_is_deterministic_and_fixed_length() -> Result<(), RestoreError> {
        let chunk = Bytes::from(vec![7u8; 3 * 1024 * 1024]);
        let first = hasher::chunk_checksum(chunk.clone()).await?;
        let second = hasher::chunk_checksum(chunk).await?;
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);

        let other = hasher::chunk_checksum(Bytes::from_static(b"different")).await?;
        assert_ne!(first, other);
        assert_eq!(other.len(), 64);
        Ok(())
    }
}
