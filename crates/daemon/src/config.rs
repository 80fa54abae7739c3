use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pg_backuper_docker::WaitOptions;
use pg_backuper_storage::S3Config;
use serde::Deserialize;
use thiserror::Error;

use crate::scheduler::{Schedule, ScheduleError};

pub const DEFAULT_SCHEDULE: &str = "@daily";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Back up labelled postgres containers to S3-compatible object storage.
#[derive(Debug, Parser, Default)]
#[command(name = "pg-backuper", version)]
pub struct Cli {
    /// Optional TOML config file; flags and environment take precedence.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Cron expression for scheduled scans [default: @daily]
    #[arg(long, env = "PB_SCHEDULE")]
    pub schedule: Option<String>,

    /// Object storage endpoint, host[:port]
    #[arg(long, env = "PB_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, env = "PB_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    #[arg(long, env = "PB_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    #[arg(long, env = "PB_BUCKET")]
    pub bucket: Option<String>,

    /// Use TLS for the object storage endpoint [default: true]
    #[arg(long, env = "PB_USE_SSL")]
    pub use_ssl: Option<bool>,

    #[arg(long, env = "PB_REGION")]
    pub region: Option<String>,

    /// Run one scan now and exit instead of scheduling
    #[arg(long = "do")]
    pub run_now: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub schedule: ScheduleConfig,
    pub dump: DumpConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub use_ssl: Option<bool>,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ScheduleConfig {
    pub cron: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct DumpConfig {
    pub poll_interval_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading config file {path:?}"))?;
    toml::from_str(&contents).with_context(|| format!("parsing config file {path:?}"))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {name} (--{name} or {env})")]
    Missing {
        name: &'static str,
        env: &'static str,
    },
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Fully resolved settings, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct BackuperConfig {
    pub storage: S3Config,
    pub schedule: Schedule,
    pub wait: WaitOptions,
    pub one_shot: bool,
}

impl BackuperConfig {
    pub fn resolve(cli: &Cli, file: &Config) -> Result<Self, ConfigError> {
        let storage = S3Config {
            endpoint: required(&cli.endpoint, &file.storage.endpoint, "endpoint", "PB_ENDPOINT")?,
            access_key: required(
                &cli.access_key,
                &file.storage.access_key,
                "access-key",
                "PB_ACCESS_KEY",
            )?,
            secret_key: required(
                &cli.secret_key,
                &file.storage.secret_key,
                "secret-key",
                "PB_SECRET_KEY",
            )?,
            bucket: required(&cli.bucket, &file.storage.bucket, "bucket", "PB_BUCKET")?,
            use_ssl: cli.use_ssl.or(file.storage.use_ssl).unwrap_or(true),
            region: cli
                .region
                .clone()
                .or_else(|| file.storage.region.clone())
                .unwrap_or_else(|| DEFAULT_REGION.to_owned()),
        };

        let expr = cli
            .schedule
            .as_deref()
            .or(file.schedule.cron.as_deref())
            .unwrap_or(DEFAULT_SCHEDULE);
        let schedule = Schedule::parse(expr)?;

        let defaults = WaitOptions::default();
        let wait = WaitOptions {
            poll_interval: file
                .dump
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            timeout: file
                .dump
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        };

        Ok(Self {
            storage,
            schedule,
            wait,
            one_shot: cli.run_now,
        })
    }
}

fn required(
    flag: &Option<String>,
    file: &Option<String>,
    name: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    flag.clone()
        .or_else(|| file.clone())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing { name, env })
}
