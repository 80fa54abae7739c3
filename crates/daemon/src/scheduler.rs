//! Recurring scans and the two-stage interrupt handling around them.

use std::fmt;

use chrono::{DateTime, Utc};
use croner::Cron;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backuper::Backuper;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid schedule {expr:?}: {reason}")]
    Invalid { expr: String, reason: String },
    #[error("schedule {expr:?} has no occurrence after {after}")]
    Exhausted { expr: String, after: DateTime<Utc> },
}

/// A validated cron expression. Accepts 5 or 6 fields and `@daily`-style aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    expr: String,
}

impl Schedule {
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        compile(expr)?;
        Ok(Self {
            expr: expr.to_owned(),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// First occurrence strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        compile(&self.expr)?
            .find_next_occurrence(&now, false)
            .map_err(|_| ScheduleError::Exhausted {
                expr: self.expr.clone(),
                after: now,
            })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

fn compile(expr: &str) -> Result<Cron, ScheduleError> {
    Cron::new(expr)
        .with_seconds_optional()
        .parse()
        .map_err(|e| ScheduleError::Invalid {
            expr: expr.to_owned(),
            reason: e.to_string(),
        })
}

/// Runs scans on `schedule` until `shutdown` is cancelled.
///
/// Scans never overlap: the next fire time is computed once the previous scan
/// returns, and occurrences missed meanwhile are skipped. Cancellation is only
/// observed between scans, so an in-flight scan always completes.
pub async fn run_scheduled(
    backuper: &Backuper,
    schedule: &Schedule,
    shutdown: CancellationToken,
) -> Result<(), ScheduleError> {
    info!(%schedule, "started postgres backuper");

    loop {
        let now = Utc::now();
        let next = schedule.next_after(now)?;
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!(%next, wait_secs = wait.as_secs(), "next scan scheduled");

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = sleep(wait) => {}
        }

        backuper.scan().await;
    }

    info!("stopped gracefully");
    Ok(())
}

/// First interrupt cancels `shutdown`; a second one exits the process at once.
///
/// Listeners are registered before this returns and shared by both stages.
pub fn install_signal_handlers(shutdown: CancellationToken) -> std::io::Result<()> {
    let mut interrupts = Interrupts::new()?;
    tokio::spawn(async move {
        interrupts.recv().await;
        info!("interrupt received, stopping after the current scan (repeat to force exit)");
        shutdown.cancel();

        interrupts.recv().await;
        warn!("second interrupt received, exiting immediately");
        std::process::exit(1);
    });
    Ok(())
}

/// SIGINT and SIGTERM listeners, registered once and reused for every wait.
#[cfg(unix)]
pub struct Interrupts {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Interrupts {
    pub fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
    }
}

#[cfg(not(unix))]
pub struct Interrupts {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl Interrupts {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    pub async fn recv(&mut self) {
        self.ctrl_c.recv().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("rfc3339")
            .with_timezone(&Utc)
    }

    #[test]
    fn daily_alias_fires_at_midnight() {
        let schedule = Schedule::parse("@daily").unwrap();
        let next = schedule.next_after(utc("2023-01-01T10:30:00Z")).unwrap();
        assert_eq!(next, utc("2023-01-02T00:00:00Z"));
    }

    #[test]
    fn five_field_expression_is_accepted() {
        let schedule = Schedule::parse("30 2 * * *").unwrap();
        let next = schedule.next_after(utc("2023-01-01T10:30:00Z")).unwrap();
        assert_eq!(next, utc("2023-01-02T02:30:00Z"));
    }

    #[test]
    fn next_occurrence_is_strictly_later() {
        let schedule = Schedule::parse("0 * * * *").unwrap();
        let next = schedule.next_after(utc("2023-01-01T10:00:00Z")).unwrap();
        assert_eq!(next, utc("2023-01-01T11:00:00Z"));
    }

    #[cfg(unix)]
    fn send_sigterm() {
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .expect("run kill");
        assert!(status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn listeners_see_repeated_signals() {
        let mut interrupts = Interrupts::new().unwrap();

        send_sigterm();
        tokio::time::timeout(Duration::from_secs(5), interrupts.recv())
            .await
            .expect("first signal");

        send_sigterm();
        tokio::time::timeout(Duration::from_secs(5), interrupts.recv())
            .await
            .expect("second signal");
    }

    #[test]
    fn garbage_is_rejected() {
        let err = Schedule::parse("whenever").unwrap_err();
        assert!(matches!(err, ScheduleError::Invalid { .. }));
        assert!(err.to_string().contains("whenever"));
    }
}
