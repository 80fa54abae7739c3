//! Docker Engine integration through bollard.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use bollard::container::{
    DownloadFromContainerOptions, InspectContainerOptions, ListContainersOptions,
};
use bollard::exec::{CreateExecOptions, StartExecOptions};
use bollard::models::ContainerSummary;
use bollard::Docker;
use futures::TryStreamExt;
use pg_backuper_core::ContainerDescriptor;

use crate::runtime::{ContainerRuntime, ExecState};

#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform's default socket.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("Failed to connect to Docker daemon. Is Docker running?")?;
        Ok(Self { docker })
    }

    fn descriptor(summary: ContainerSummary) -> Result<ContainerDescriptor> {
        let id = summary
            .id
            .ok_or_else(|| anyhow!("container summary without id"))?;
        Ok(ContainerDescriptor {
            id,
            labels: summary.labels.unwrap_or_default(),
            names: summary.names.unwrap_or_default(),
        })
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self, label_selector: &str) -> Result<Vec<ContainerDescriptor>> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![label_selector.to_string()]);

        let options = Some(ListContainersOptions {
            filters,
            ..Default::default()
        });

        self.docker
            .list_containers(options)
            .await
            .context("list containers")?
            .into_iter()
            .map(Self::descriptor)
            .collect()
    }

    async fn container_env(&self, container_id: &str) -> Result<Vec<String>> {
        let details = self
            .docker
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
            .with_context(|| format!("inspect container {container_id}"))?;
        Ok(details
            .config
            .and_then(|config| config.env)
            .unwrap_or_default())
    }

    async fn create_exec(&self, container_id: &str, cmd: Vec<String>) -> Result<String> {
        let options = CreateExecOptions {
            cmd: Some(cmd),
            attach_stdin: Some(false),
            attach_stdout: Some(false),
            attach_stderr: Some(false),
            tty: Some(false),
            ..Default::default()
        };
        let created = self
            .docker
            .create_exec(container_id, options)
            .await
            .with_context(|| format!("create exec in container {container_id}"))?;
        Ok(created.id)
    }

    async fn start_exec(&self, exec_id: &str) -> Result<()> {
        let options = StartExecOptions {
            detach: true,
            ..Default::default()
        };
        self.docker
            .start_exec(exec_id, Some(options))
            .await
            .with_context(|| format!("start exec {exec_id}"))?;
        Ok(())
    }

    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecState> {
        let inspect = self
            .docker
            .inspect_exec(exec_id)
            .await
            .with_context(|| format!("inspect exec {exec_id}"))?;
        Ok(ExecState {
            running: inspect.running.unwrap_or(false),
            exit_code: inspect.exit_code,
        })
    }

    async fn copy_from_container(&self, container_id: &str, path: &str) -> Result<Vec<u8>> {
        let options = DownloadFromContainerOptions { path };
        self.docker
            .download_from_container(container_id, Some(options))
            .try_fold(Vec::new(), |mut archive, chunk| async move {
                archive.extend_from_slice(&chunk);
                Ok(archive)
            })
            .await
            .with_context(|| format!("copy {path} from container {container_id}"))
    }
}
