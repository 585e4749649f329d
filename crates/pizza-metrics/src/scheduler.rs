//! Periodic export.
//!
//! Every period the scheduler takes one snapshot of the hub, dispatches one
//! push per series value, then closes the window: latency means are drained
//! and CPU/memory are resampled, so the next tick reports them.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::export::Exporter;
use crate::hub::{SharedMetricsHub, WindowSummary};

/// Phase of the export loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick.
    Idle,
    /// Building and dispatching payloads.
    Exporting,
    /// Loop has exited.
    Stopped,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Exporting,
            _ => SchedulerState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SchedulerState::Idle => 0,
            SchedulerState::Exporting => 1,
            SchedulerState::Stopped => 2,
        }
    }
}

#[derive(Debug, Default)]
struct Status {
    state: AtomicU8,
    ticks: AtomicU64,
}

impl Status {
    fn set(&self, state: SchedulerState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn get(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

/// Outcome of one export tick.
pub struct TickReport {
    /// Number of pushes dispatched.
    pub dispatched: usize,
    /// Values written back when the window closed.
    pub window: WindowSummary,
    handles: Vec<JoinHandle<()>>,
}

impl TickReport {
    /// Wait until every push dispatched by this tick has finished.
    pub async fn settled(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "metric push task panicked");
            }
        }
    }
}

/// Drives export on a fixed period.
pub struct ExportScheduler {
    hub: SharedMetricsHub,
    exporter: Exporter,
    period: Duration,
    status: Arc<Status>,
}

impl ExportScheduler {
    /// Create a scheduler. Nothing runs until [`start`](Self::start).
    pub fn new(hub: SharedMetricsHub, exporter: Exporter, period: Duration) -> Self {
        Self {
            hub,
            exporter,
            period,
            status: Arc::new(Status::default()),
        }
    }

    /// Current phase.
    pub fn state(&self) -> SchedulerState {
        self.status.get()
    }

    /// Run one export cycle now.
    ///
    /// Pushes are spawned on the current runtime; the report carries their
    /// handles for callers that want to wait.
    pub fn tick(&self) -> TickReport {
        self.status.set(SchedulerState::Exporting);

        let snapshot = self.hub.snapshot();
        let handles: Vec<_> = snapshot
            .series_points()
            .into_iter()
            .filter_map(|point| self.exporter.dispatch(point))
            .collect();
        let window = self.hub.close_window();

        let tick = self.status.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            tick,
            dispatched = handles.len(),
            cpu_percentage = window.system.cpu_percentage,
            memory_percentage = window.system.memory_percentage,
            "metrics exported"
        );

        self.status.set(SchedulerState::Idle);
        TickReport {
            dispatched: handles.len(),
            window,
            handles,
        }
    }

    /// Start the background loop. The first tick fires one period from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> ExportTask {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let status = Arc::clone(&self.status);
        let period = self.period;

        let handle = tokio::spawn(async move {
            info!(period_ms = period.as_millis() as u64, "metrics export task started");

            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // Also resolves when the task handle is dropped.
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        // Pushes run detached; the loop does not wait for them.
                        let _ = self.tick();
                    }
                }
            }

            self.status.set(SchedulerState::Stopped);
            info!("metrics export task stopped");
        });

        ExportTask {
            handle,
            shutdown: shutdown_tx,
            status,
        }
    }
}

/// Handle for the background export loop.
///
/// Dropping the handle also stops the loop.
pub struct ExportTask {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
    status: Arc<Status>,
}

impl ExportTask {
    /// Current phase.
    pub fn state(&self) -> SchedulerState {
        self.status.get()
    }

    /// Ticks completed so far.
    pub fn tick_count(&self) -> u64 {
        self.status.ticks.load(Ordering::SeqCst)
    }

    /// Signal the loop to stop. Idempotent.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Stop the loop and wait for it to exit.
    pub async fn join(self) {
        self.stop();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "metrics export task panicked");
        }
    }
}
