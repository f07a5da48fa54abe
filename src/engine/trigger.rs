//! Restart-safe cadence for the sweep.
//!
//! The last completed run is kept in a durable [`RunMarker`]; every
//! invocation (a request on a hot path, or a ticker) compares it with the
//! clock and only sweeps once the interval has elapsed. Two processes can
//! both decide to run; the attendance key makes that harmless.
//!
//! Cadence therefore depends on traffic and tick period, not a guarantee.
//! The grace period tolerates a few minutes of slack.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use super::sweep::SweepReport;
use super::{AttendanceEngine, EngineError};
use crate::store::RunMarker;

pub const DEFAULT_SWEEP_INTERVAL_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    NotDue { last_run: DateTime<Utc> },
    /// A sweep is already running in this process.
    Skipped,
    Ran(SweepReport),
    Failed(String),
}

pub struct ResilientTrigger {
    engine: Arc<AttendanceEngine>,
    marker: Arc<dyn RunMarker>,
    interval: Duration,
    in_flight: AtomicBool,
}

// Clears the in-flight flag even if the sweep future is dropped midway.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ResilientTrigger {
    pub fn new(engine: Arc<AttendanceEngine>, marker: Arc<dyn RunMarker>, interval: Duration) -> Self {
        Self {
            engine,
            marker,
            interval,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Last completed sweep; unreadable markers read as `None`.
    pub async fn last_run(&self) -> Option<DateTime<Utc>> {
        match self.marker.last_run().await {
            Ok(at) => at,
            Err(e) => {
                warn!(error = %e, "Cannot read last-run marker, treating as never run");
                None
            }
        }
    }

    fn is_due(&self, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_run {
            None => true,
            // a marker from the future means the clock moved back
            Some(last) if last > now => true,
            Some(last) => now - last >= self.interval,
        }
    }

    /// Runs the sweep if the interval has elapsed since the last one.
    /// Never returns an error: failures are logged and retried next time.
    pub async fn maybe_run(&self) -> TriggerOutcome {
        let last_run = self.last_run().await;
        if !self.is_due(last_run, self.engine.now()) {
            if let Some(last) = last_run {
                return TriggerOutcome::NotDue { last_run: last };
            }
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sweep already running in this process");
            return TriggerOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        match self.sweep_and_record().await {
            Ok(report) => TriggerOutcome::Ran(report),
            Err(e) => {
                error!(error = %e, "Auto-absence sweep failed, will retry on next trigger");
                TriggerOutcome::Failed(e.to_string())
            }
        }
    }

    /// Administrative "run now": ignores the interval but still moves the marker.
    pub async fn run_now(&self) -> Result<SweepReport, EngineError> {
        self.sweep_and_record().await
    }

    async fn sweep_and_record(&self) -> Result<SweepReport, EngineError> {
        let report = self.engine.run_sweep().await?;

        let finished_at = self.engine.now();
        if let Err(e) = self.marker.record_run(finished_at).await {
            warn!(error = %e, "Sweep finished but last-run marker was not saved");
        }

        Ok(report)
    }
}

/// Polls the trigger on the actix runtime every `every`.
///
/// The staleness marker still decides whether a sweep runs, so a short tick
/// only bounds how late a due sweep can start.
pub fn spawn_ticker(trigger: Arc<ResilientTrigger>, every: std::time::Duration) {
    info!(every_secs = every.as_secs(), "Auto-absence ticker started");

    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(every);
        loop {
            ticker.tick().await;
            if let TriggerOutcome::Ran(report) = trigger.maybe_run().await {
                debug!(?report, "Ticker sweep completed");
            }
        }
    });
}
