pub mod backuper;
pub mod config;
pub mod scheduler;

pub use backuper::{Backuper, ScanReport};
pub use config::{BackuperConfig, Cli};
pub use scheduler::{install_signal_handlers, run_scheduled, Schedule};
