use std::io::Cursor;
use std::sync::Arc;

use anyhow::{Context, Result};
use pg_backuper_core::{decode_archive, BackupTarget, ContainerDescriptor, BACKUP_SELECTOR};
use pg_backuper_docker::{ContainerRuntime, DumpExtractor, WaitOptions};
use pg_backuper_storage::{ArtifactStore, UploadOutcome, Uploader};
use tracing::{debug, error, info};

/// Counts for one scan cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub discovery_failed: bool,
    pub attempted: usize,
    pub uploaded: usize,
    pub failed: usize,
}

/// Discovers labelled containers and backs each one up in turn.
#[derive(Clone)]
pub struct Backuper {
    runtime: Arc<dyn ContainerRuntime>,
    extractor: DumpExtractor,
    uploader: Uploader,
}

impl Backuper {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<dyn ArtifactStore>,
        wait: WaitOptions,
    ) -> Self {
        Self {
            extractor: DumpExtractor::new(runtime.clone(), wait),
            uploader: Uploader::new(store),
            runtime,
        }
    }

    /// One discovery-then-backup cycle. Per-container failures are logged and
    /// skipped; only a failed listing ends the cycle early.
    pub async fn scan(&self) -> ScanReport {
        info!("start containers scan");
        let mut report = ScanReport::default();

        let containers = match self.runtime.list_containers(BACKUP_SELECTOR).await {
            Ok(containers) => containers,
            Err(e) => {
                error!(error = %format!("{e:#}"), "failed to list containers");
                report.discovery_failed = true;
                return report;
            }
        };

        for container in &containers {
            report.attempted += 1;
            match self.backup_container(container).await {
                Ok(outcome) if outcome.is_uploaded() => report.uploaded += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    error!(
                        container = %container.short_id(),
                        error = %format!("{e:#}"),
                        "failed to back up container"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            attempted = report.attempted,
            uploaded = report.uploaded,
            failed = report.failed,
            "end containers scan"
        );
        report
    }

    /// Resolve, dump, decode, upload. The first failing stage ends this
    /// container's attempt; upload failures come back as an outcome.
    pub async fn backup_container(&self, container: &ContainerDescriptor) -> Result<UploadOutcome> {
        let short_id = container.short_id();
        info!(container = %short_id, "starting backup for container");

        let target = self.resolve_target(container).await;
        debug!(
            container = %short_id,
            app = %target.app_name,
            database = %target.database,
            user = %target.user,
            "resolved backup target"
        );

        let archive = self
            .extractor
            .dump(container, &target.database, &target.user)
            .await?;
        let files = decode_archive(Cursor::new(archive)).context("decoding dump archive")?;
        let outcome = self.uploader.upload(&target.app_name, files).await;

        info!(container = %short_id, uploaded = outcome.is_uploaded(), "finished backup for container");
        Ok(outcome)
    }

    /// Inspection failures fall back to defaults rather than failing the backup.
    pub async fn resolve_target(&self, container: &ContainerDescriptor) -> BackupTarget {
        let env = if BackupTarget::needs_environment(container) {
            match self.runtime.container_env(&container.id).await {
                Ok(env) => Some(env),
                Err(e) => {
                    debug!(
                        container = %container.short_id(),
                        error = %format!("{e:#}"),
                        "container inspection failed, using defaults"
                    );
                    None
                }
            }
        } else {
            None
        };
        BackupTarget::resolve(container, env.as_deref())
    }
}
