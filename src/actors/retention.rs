//! RetentionActor - prunes old readings and long-resolved alerts
//!
//! Two age-filtered deletes, run on an interval (daily by default) and on
//! demand through [`RetentionHandle`]. Both are idempotent and need no
//! coordination with ingestion, so the actor never blocks a request.
//!
//! Unresolved alerts are never deleted, however old.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, instrument, trace, warn};

use super::messages::{RetentionCommand, RetentionStats, SweepReport};
use crate::config::RetentionConfig;
use crate::storage::{StorageBackend, StorageResult};

/// Delete everything the policy says is expired as of `now`
///
/// Both deletes are attempted even if the first one fails.
pub async fn sweep(
    backend: &dyn StorageBackend,
    policy: &RetentionConfig,
    now: DateTime<Utc>,
) -> StorageResult<SweepReport> {
    let readings_cutoff = cutoff(now, policy.readings_days);
    let alerts_cutoff = cutoff(now, policy.resolved_alerts_days);

    debug!(
        "running retention sweep (readings before {}, resolved alerts before {})",
        readings_cutoff, alerts_cutoff
    );

    let readings = backend.delete_readings_before(readings_cutoff).await;
    let alerts = backend.delete_resolved_alerts_before(alerts_cutoff).await;

    let report = SweepReport {
        readings_deleted: readings?,
        alerts_deleted: alerts?,
        readings_cutoff,
        alerts_cutoff,
    };

    if report.readings_deleted > 0 || report.alerts_deleted > 0 {
        info!(
            "retention sweep complete: deleted {} readings and {} resolved alerts",
            report.readings_deleted, report.alerts_deleted
        );
    } else {
        trace!("retention sweep: nothing to delete");
    }

    Ok(report)
}

/// Instant `days` before `now`. A window reaching past the earliest
/// representable instant keeps everything.
fn cutoff(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    chrono::Duration::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Actor that runs the retention sweep
pub struct RetentionActor {
    backend: Arc<dyn StorageBackend>,
    policy: RetentionConfig,
    command_rx: mpsc::Receiver<RetentionCommand>,
    stats: RetentionStats,
}

impl RetentionActor {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        policy: RetentionConfig,
        command_rx: mpsc::Receiver<RetentionCommand>,
    ) -> Self {
        Self {
            backend,
            policy,
            command_rx,
            stats: RetentionStats::default(),
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        let scheduled = self.policy.enabled;
        let period = Duration::from_secs(self.policy.interval_hours.max(1) as u64 * 3600);

        debug!(
            "starting retention actor (scheduled: {}, every {}h)",
            scheduled,
            period.as_secs() / 3600
        );

        // Run initial sweep on startup if scheduling is enabled
        if scheduled {
            debug!("running initial retention sweep on startup");
            let _ = self.run_sweep(Utc::now()).await;
        }

        let mut sweep_interval = time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = sweep_interval.tick(), if scheduled => {
                    debug!("scheduled retention sweep triggered");
                    let _ = self.run_sweep(Utc::now()).await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("retention actor stopped");
    }

    async fn run_sweep(&mut self, now: DateTime<Utc>) -> StorageResult<SweepReport> {
        let result = sweep(self.backend.as_ref(), &self.policy, now).await;

        self.stats.sweep_count += 1;
        self.stats.last_sweep = Some(now);

        match &result {
            Ok(report) => {
                self.stats.total_readings_deleted += report.readings_deleted as u64;
                self.stats.total_alerts_deleted += report.alerts_deleted as u64;
                self.stats.last_error = None;
            }
            Err(e) => {
                // retried on the next tick
                error!("retention sweep failed: {}", e);
                self.stats.last_error = Some(e.to_string());
            }
        }

        result
    }

    /// Handle a command, returning `false` once the actor should stop
    async fn handle_command(&mut self, cmd: RetentionCommand) -> bool {
        match cmd {
            RetentionCommand::SweepNow { now, respond_to } => {
                debug!("manual retention sweep requested");
                let result = self.run_sweep(now).await;
                let _ = respond_to.send(result);
            }
            RetentionCommand::GetStats { respond_to } => {
                let _ = respond_to.send(self.stats.clone());
            }
            RetentionCommand::Shutdown => {
                info!("retention actor shutting down");
                return false;
            }
        }

        true
    }
}

/// Handle for controlling the RetentionActor
#[derive(Clone)]
pub struct RetentionHandle {
    sender: mpsc::Sender<RetentionCommand>,
}

impl RetentionHandle {
    pub fn spawn(backend: Arc<dyn StorageBackend>, policy: RetentionConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = RetentionActor::new(backend, policy, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Sweep immediately and wait for the report
    pub async fn sweep_now(&self) -> anyhow::Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> anyhow::Result<SweepReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RetentionCommand::SweepNow { now, respond_to: tx })
            .await?;

        Ok(rx.await??)
    }

    /// Get sweep statistics
    pub async fn get_stats(&self) -> Option<RetentionStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RetentionCommand::GetStats { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()
    }

    /// Shutdown the retention actor
    pub async fn shutdown(&self) {
        let _ = self.sender.send(RetentionCommand::Shutdown).await;
    }
}
