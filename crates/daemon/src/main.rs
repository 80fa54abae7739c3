use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pg_backuper_daemon::config::{self, BackuperConfig, Cli, Config};
use pg_backuper_daemon::{install_signal_handlers, run_scheduled, Backuper};
use pg_backuper_docker::DockerRuntime;
use pg_backuper_storage::S3Store;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => {
            info!(?path, "loading config file");
            config::load_config(path)?
        }
        None => Config::default(),
    };
    let config = BackuperConfig::resolve(&cli, &file)?;

    let runtime = Arc::new(DockerRuntime::connect()?);
    let store = Arc::new(S3Store::new(&config.storage)?);
    let backuper = Backuper::new(runtime, store, config.wait);

    let shutdown = CancellationToken::new();
    install_signal_handlers(shutdown.clone()).context("install signal handlers")?;

    if config.one_shot {
        backuper.scan().await;
        return Ok(());
    }

    run_scheduled(&backuper, &config.schedule, shutdown).await?;
    Ok(())
}
