use std::sync::Arc;

use anyhow::{Context, Result};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload, WriteMultipart};
use tracing::debug;

use crate::store::ArtifactStore;

/// Connection settings for an S3-compatible endpoint such as MinIO.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// `host[:port]`, without scheme.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub use_ssl: bool,
    pub region: String,
}

impl S3Config {
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{scheme}://{}", self.endpoint.trim_end_matches('/'))
    }
}

/// Payloads above this size go through a multipart upload.
pub const MULTIPART_THRESHOLD: usize = 64 * 1024 * 1024;
/// S3 requires parts of at least 5 MiB (except the last).
pub const MULTIPART_PART_SIZE: usize = 16 * 1024 * 1024;
const MAX_CONCURRENT_PARTS: usize = 4;

/// S3-backed artifact store. Uses path-style requests so plain MinIO deployments work.
///
/// A single PUT is capped at 5 GiB by S3, so large dumps are split into parts.
pub struct S3Store {
    client: Arc<dyn ObjectStore>,
    location_prefix: String,
    multipart_threshold: usize,
    part_size: usize,
}

impl S3Store {
    pub fn new(config: &S3Config) -> Result<Self> {
        let endpoint_url = config.endpoint_url();
        let client = AmazonS3Builder::new()
            .with_endpoint(&endpoint_url)
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_access_key_id(&config.access_key)
            .with_secret_access_key(&config.secret_key)
            .with_allow_http(!config.use_ssl)
            .with_virtual_hosted_style_request(false)
            .build()
            .with_context(|| format!("build object store client for {endpoint_url}"))?;

        Ok(Self::with_client(
            Arc::new(client),
            format!("{endpoint_url}/{}", config.bucket),
        ))
    }

    fn with_client(client: Arc<dyn ObjectStore>, location_prefix: String) -> Self {
        Self {
            client,
            location_prefix,
            multipart_threshold: MULTIPART_THRESHOLD,
            part_size: MULTIPART_PART_SIZE,
        }
    }

    fn uses_multipart(&self, len: usize) -> bool {
        len > self.multipart_threshold
    }

    async fn put_multipart(&self, path: &Path, payload: &[u8]) -> Result<()> {
        let upload = self
            .client
            .put_multipart(path)
            .await
            .context("start multipart upload")?;
        let mut writer = WriteMultipart::new_with_chunk_size(upload, self.part_size);

        for chunk in payload.chunks(self.part_size) {
            if let Err(e) = writer.wait_for_capacity(MAX_CONCURRENT_PARTS).await {
                // Abort so the store does not keep orphaned parts around.
                let _ = writer.abort().await;
                return Err(e).context("upload part");
            }
            writer.write(chunk);
        }

        writer.finish().await.context("complete multipart upload")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ArtifactStore for S3Store {
    async fn put_object(&self, key: &str, payload: Vec<u8>) -> Result<String> {
        let path = Path::from(key);
        if self.uses_multipart(payload.len()) {
            debug!(key, size_bytes = payload.len(), "using multipart upload");
            self.put_multipart(&path, &payload)
                .await
                .with_context(|| format!("put object {key}"))?;
        } else {
            self.client
                .put(&path, PutPayload::from(payload))
                .await
                .with_context(|| format!("put object {key}"))?;
        }
        Ok(format!("{}/{path}", self.location_prefix))
    }
}
