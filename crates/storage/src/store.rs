use anyhow::Result;

/// Destination for backup artifacts, implemented by the S3 and in-memory backends.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `payload` under `key`, returning where the object ended up.
    async fn put_object(&self, key: &str, payload: Vec<u8>) -> Result<String>;
}
