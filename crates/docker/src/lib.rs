pub mod docker;
pub mod extract;
pub mod runtime;

pub use docker::DockerRuntime;
pub use extract::{dump_command, DumpExtractor, ExtractError, WaitOptions, WaitOutcome};
pub use runtime::{ContainerRuntime, ExecState};
