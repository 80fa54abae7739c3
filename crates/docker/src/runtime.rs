use anyhow::Result;
use pg_backuper_core::ContainerDescriptor;

/// Observed state of an exec invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecState {
    pub running: bool,
    pub exit_code: Option<i64>,
}

/// The container runtime operations the backup pipeline consumes.
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Containers carrying `label_selector` (`key=value`), in runtime order.
    async fn list_containers(&self, label_selector: &str) -> Result<Vec<ContainerDescriptor>>;

    /// Declared environment of a container as raw `KEY=value` entries.
    async fn container_env(&self, container_id: &str) -> Result<Vec<String>>;

    /// Create an exec invocation and return its id.
    async fn create_exec(&self, container_id: &str, cmd: Vec<String>) -> Result<String>;

    /// Start an exec invocation detached; does not wait for it to finish.
    async fn start_exec(&self, exec_id: &str) -> Result<()>;

    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecState>;

    /// Copy `path` out of a container as a tar stream, fully buffered.
    async fn copy_from_container(&self, container_id: &str, path: &str) -> Result<Vec<u8>>;
}
