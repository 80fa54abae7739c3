use std::sync::Arc;

use chrono::{DateTime, Utc};
use pg_backuper_core::{content_hash, object_key, ArchiveFileMap, DUMP_FILE_NAME};
use tracing::{error, info, warn};

use crate::store::ArtifactStore;

/// Terminal result of one upload attempt. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded {
        key: String,
        location: String,
        size_bytes: usize,
        sha256: String,
    },
    /// The archive did not contain the dump file; nothing was written.
    MissingDump,
    Failed {
        key: String,
        error: String,
    },
}

impl UploadOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded { .. })
    }
}

#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn ArtifactStore>,
}

impl Uploader {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    pub async fn upload(&self, app_name: &str, files: ArchiveFileMap) -> UploadOutcome {
        self.upload_at(app_name, files, Utc::now()).await
    }

    pub async fn upload_at(
        &self,
        app_name: &str,
        mut files: ArchiveFileMap,
        at: DateTime<Utc>,
    ) -> UploadOutcome {
        let Some(payload) = files.remove(DUMP_FILE_NAME) else {
            warn!(
                app = %app_name,
                entries = files.len(),
                "archive has no {DUMP_FILE_NAME}, skipping upload"
            );
            return UploadOutcome::MissingDump;
        };

        let key = object_key(app_name, at);
        let size_bytes = payload.len();
        let sha256 = content_hash(&payload);

        match self.store.put_object(&key, payload).await {
            Ok(location) => {
                info!(app = %app_name, %location, size_bytes, %sha256, "uploaded backup file");
                UploadOutcome::Uploaded {
                    key,
                    location,
                    size_bytes,
                    sha256,
                }
            }
            Err(e) => {
                let error = format!("{e:#}");
                error!(app = %app_name, %key, %error, "failed to upload backup file");
                UploadOutcome::Failed { key, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use pg_backuper_core::content_hash;

    use super::*;
    use crate::memory_store::MemoryStore;

    struct UnreachableStore;

    #[async_trait::async_trait]
    impl ArtifactStore for UnreachableStore {
        async fn put_object(&self, _key: &str, _payload: Vec<u8>) -> Result<String> {
            bail!("connection refused")
        }
    }

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2023-01-01T00:00:00Z")
            .expect("rfc3339")
            .with_timezone(&Utc)
    }

    fn dump_files(body: &[u8]) -> ArchiveFileMap {
        ArchiveFileMap::from([(DUMP_FILE_NAME.to_owned(), body.to_vec())])
    }

    #[tokio::test]
    async fn uploads_dump_under_timestamped_key() {
        let store = Arc::new(MemoryStore::new());
        let uploader = Uploader::new(store.clone());

        let outcome = uploader.upload_at("shop", dump_files(b"select 1;"), at()).await;

        assert_eq!(
            outcome,
            UploadOutcome::Uploaded {
                key: "shop/2023-01-01T00:00:00Z.sql".to_owned(),
                location: "memory://shop/2023-01-01T00:00:00Z.sql".to_owned(),
                size_bytes: 9,
                sha256: content_hash(b"select 1;"),
            }
        );
        assert_eq!(
            store.objects()["shop/2023-01-01T00:00:00Z.sql"],
            b"select 1;".to_vec()
        );
    }

    #[tokio::test]
    async fn missing_dump_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let uploader = Uploader::new(store.clone());
        let files = ArchiveFileMap::from([("other.txt".to_owned(), b"x".to_vec())]);

        let outcome = uploader.upload_at("shop", files, at()).await;

        assert_eq!(outcome, UploadOutcome::MissingDump);
        assert!(store.objects().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_reported_not_raised() {
        let uploader = Uploader::new(Arc::new(UnreachableStore));

        let outcome = uploader.upload_at("shop", dump_files(b"x"), at()).await;

        match outcome {
            UploadOutcome::Failed { key, error } => {
                assert_eq!(key, "shop/2023-01-01T00:00:00Z.sql");
                assert!(error.contains("connection refused"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
