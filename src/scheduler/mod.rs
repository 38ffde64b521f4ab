//! Background loop that promotes due scheduled notifications.
//!
//! Ticks run one at a time inside a single task. A tick that overruns the
//! interval delays the next one; missed ticks are skipped rather than
//! replayed in a burst. Each tick first requeues claims older than the
//! claim timeout, so a record claimed by a pass that died mid-dispatch is
//! picked up again.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::metrics::SchedulerMetrics;
use crate::notification::{EngineResult, NotificationEngine, ProcessReport};

struct Running {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the scheduling loop. `start` and `stop` are idempotent.
pub struct Scheduler {
    engine: Arc<NotificationEngine>,
    interval: Duration,
    claim_timeout: Duration,
    running: Mutex<Option<Running>>,
}

impl Scheduler {
    pub fn new(engine: Arc<NotificationEngine>, config: &SchedulerConfig) -> Self {
        Self::with_interval(engine, Duration::from_secs(config.interval_seconds))
            .with_claim_timeout(Duration::from_secs(config.claim_timeout_seconds))
    }

    pub fn with_interval(engine: Arc<NotificationEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval: interval.max(Duration::from_millis(1)),
            claim_timeout: Duration::from_secs(600),
            running: Mutex::new(None),
        }
    }

    pub fn with_claim_timeout(mut self, claim_timeout: Duration) -> Self {
        self.claim_timeout = claim_timeout;
        self
    }

    /// Spawn the loop. Returns false if it was already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return false;
        }

        let (shutdown, rx) = broadcast::channel(1);
        let task = SchedulerTask {
            engine: self.engine.clone(),
            interval: self.interval,
            claim_timeout: self.claim_timeout,
            shutdown: rx,
        };
        let handle = tokio::spawn(task.run());

        *running = Some(Running { shutdown, handle });
        true
    }

    /// Stop the loop and wait for an in-flight tick to finish.
    ///
    /// Returns false if it was not running. No tick begins after this returns.
    pub async fn stop(&self) -> bool {
        let Some(Running { shutdown, handle }) = self.running.lock().await.take() else {
            return false;
        };

        let _ = shutdown.send(());
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Scheduler task ended abnormally");
        }
        true
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Run one pass outside the loop
    pub async fn run_once(&self) -> EngineResult<ProcessReport> {
        tick(&self.engine, self.claim_timeout).await
    }
}

/// The spawned loop
struct SchedulerTask {
    engine: Arc<NotificationEngine>,
    interval: Duration,
    claim_timeout: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl SchedulerTask {
    async fn run(mut self) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.recv() => {
                    tracing::info!("Scheduler received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    if let Err(e) = tick(&self.engine, self.claim_timeout).await {
                        tracing::error!(error = %e, "Scheduler tick failed");
                    }
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }
}

async fn tick(engine: &NotificationEngine, claim_timeout: Duration) -> EngineResult<ProcessReport> {
    let now = engine.clock().now();
    let timeout = ChronoDuration::from_std(claim_timeout).unwrap_or(ChronoDuration::MAX);
    if let Some(cutoff) = now.checked_sub_signed(timeout) {
        engine.requeue_stale_claims(cutoff).await?;
    }

    let report = engine.process_due(now).await?;
    SchedulerMetrics::record_tick(report.sent, report.failed, report.skipped);
    Ok(report)
}
