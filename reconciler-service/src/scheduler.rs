use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    runner::{PassReport, ReconcileError, Reconciler},
    store::{ConfigStore, ReadingStore},
};

/// Idle/Running flag guarding against overlapping passes.
#[derive(Debug, Default)]
pub struct SingleFlight {
    running: AtomicBool,
}

impl SingleFlight {
    /// Claim the flag, or `None` if a pass is already running.
    pub fn try_acquire(self: &Arc<Self>) -> Option<PassGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard {
                flight: Arc::clone(self),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Clears the flag when dropped, whether the pass succeeded, failed or panicked.
#[derive(Debug)]
pub struct PassGuard {
    flight: Arc<SingleFlight>,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.flight.running.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub duration_ms: u64,
    pub report: Option<PassReport>,
    pub error: Option<String>,
}

impl PassSummary {
    fn new(result: &Result<PassReport, ReconcileError>, elapsed: Duration) -> Self {
        let (report, error) = match result {
            Ok(report) => (Some(report.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            finished_at: OffsetDateTime::now_utc(),
            duration_ms: elapsed.as_millis() as u64,
            report,
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub pass_in_progress: bool,
    pub skipped_ticks: u64,
    pub last_pass: Option<PassSummary>,
}

/// Process-wide pass state shared with the status endpoint.
#[derive(Debug, Default)]
pub struct PassStatus {
    flight: Arc<SingleFlight>,
    skipped_ticks: AtomicU64,
    last_pass: Mutex<Option<PassSummary>>,
}

impl PassStatus {
    pub fn is_running(&self) -> bool {
        self.flight.is_running()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            pass_in_progress: self.flight.is_running(),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            last_pass: self.last_pass.lock().map(|g| g.clone()).unwrap_or_else(|p| p.into_inner().clone()),
        }
    }

    fn record(&self, summary: PassSummary) {
        match self.last_pass.lock() {
            Ok(mut guard) => *guard = Some(summary),
            Err(poisoned) => *poisoned.into_inner() = Some(summary),
        }
    }
}

#[derive(Debug)]
pub enum Trigger {
    Started(JoinHandle<()>),
    Skipped,
}

/// Fires reconciliation passes on a fixed interval, dropping ticks that land
/// while a pass is still running.
pub struct Scheduler<R, C> {
    reconciler: Arc<Reconciler<R, C>>,
    status: Arc<PassStatus>,
    interval: Duration,
}

impl<R, C> Scheduler<R, C>
where
    R: ReadingStore + 'static,
    C: ConfigStore + 'static,
{
    pub fn new(reconciler: Reconciler<R, C>, interval: Duration) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            status: Arc::new(PassStatus::default()),
            interval,
        }
    }

    pub fn status(&self) -> Arc<PassStatus> {
        Arc::clone(&self.status)
    }

    /// Start a pass in the background unless one is already running.
    pub fn trigger(&self) -> Trigger {
        let Some(guard) = self.status.flight.try_acquire() else {
            self.status.skipped_ticks.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("reconcile_passes_skipped_total").increment(1);
            tracing::info!("skipping tick, previous pass still running");
            return Trigger::Skipped;
        };

        let reconciler = Arc::clone(&self.reconciler);
        let status = Arc::clone(&self.status);
        Trigger::Started(tokio::spawn(async move {
            let _guard = guard;
            let started = Instant::now();
            let result = reconciler.run_pass().await;
            status.record(PassSummary::new(&result, started.elapsed()));
        }))
    }

    /// Tick until `cancel` fires, then wait for any in-flight pass.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<JoinHandle<()>> = None;

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "reconciliation scheduler started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Trigger::Started(handle) = self.trigger() {
                        in_flight = Some(handle);
                    }
                }
            }
        }

        if let Some(handle) = in_flight {
            if !handle.is_finished() {
                tracing::info!("waiting for in-flight reconciliation pass");
            }
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "reconciliation pass task failed");
            }
        }
        tracing::info!("reconciliation scheduler stopped");
    }
}
