//! Running `pg_dump` inside a container and pulling the dump back out.

use std::sync::Arc;
use std::time::Duration;

use pg_backuper_core::{ContainerDescriptor, DUMP_PATH};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::runtime::ContainerRuntime;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Finished { exit_code: Option<i64> },
    TimedOut,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("creating dump exec in container {container}")]
    CreateExec {
        container: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("starting dump exec {exec_id}")]
    StartExec {
        exec_id: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("polling dump exec {exec_id}")]
    Inspect {
        exec_id: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("copying {path} out of container {container}")]
    Copy {
        container: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Shell invocation writing the dump of `database` to [`DUMP_PATH`].
pub fn dump_command(database: &str, user: &str) -> Vec<String> {
    vec![
        "sh".to_owned(),
        "-c".to_owned(),
        format!(
            "pg_dump -U {} {} > {DUMP_PATH}",
            shell_quote(user),
            shell_quote(database)
        ),
    ]
}

fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

#[derive(Clone)]
pub struct DumpExtractor {
    runtime: Arc<dyn ContainerRuntime>,
    wait: WaitOptions,
}

impl DumpExtractor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, wait: WaitOptions) -> Self {
        Self { runtime, wait }
    }

    /// Dumps `database` as `user` and returns the copied-out tar stream.
    ///
    /// Running past the wait timeout is logged and the copy goes ahead, so
    /// the archive may hold a dump that is still being written.
    pub async fn dump(
        &self,
        container: &ContainerDescriptor,
        database: &str,
        user: &str,
    ) -> Result<Vec<u8>, ExtractError> {
        let short_id = container.short_id();

        let exec_id = self
            .runtime
            .create_exec(&container.id, dump_command(database, user))
            .await
            .map_err(|source| ExtractError::CreateExec {
                container: short_id.to_owned(),
                source,
            })?;

        self.runtime
            .start_exec(&exec_id)
            .await
            .map_err(|source| ExtractError::StartExec {
                exec_id: exec_id.clone(),
                source,
            })?;

        match self.wait_for_exec(&exec_id).await? {
            WaitOutcome::Finished {
                exit_code: Some(code),
            } if code != 0 => {
                warn!(container = %short_id, exec = %exec_id, exit_code = code, "dump exec exited with failure")
            }
            WaitOutcome::Finished { .. } => {
                debug!(container = %short_id, exec = %exec_id, "dump exec finished")
            }
            WaitOutcome::TimedOut => warn!(
                container = %short_id,
                exec = %exec_id,
                timeout_ms = self.wait.timeout.as_millis() as u64,
                "timed out waiting for exec"
            ),
        }

        self.runtime
            .copy_from_container(&container.id, DUMP_PATH)
            .await
            .map_err(|source| ExtractError::Copy {
                container: short_id.to_owned(),
                path: DUMP_PATH.to_owned(),
                source,
            })
    }

    /// Polls the exec until it stops running or the timeout elapses. A failed
    /// poll is an error, not a finished exec.
    pub async fn wait_for_exec(&self, exec_id: &str) -> Result<WaitOutcome, ExtractError> {
        let poll = async {
            loop {
                let state = match self.runtime.inspect_exec(exec_id).await {
                    Ok(state) => state,
                    Err(source) => {
                        return Err(ExtractError::Inspect {
                            exec_id: exec_id.to_owned(),
                            source,
                        })
                    }
                };
                if !state.running {
                    return Ok(WaitOutcome::Finished {
                        exit_code: state.exit_code,
                    });
                }
                sleep(self.wait.poll_interval).await;
            }
        };

        match timeout(self.wait.timeout, poll).await {
            Ok(outcome) => outcome,
            Err(_) => Ok(WaitOutcome::TimedOut),
        }
    }
}
