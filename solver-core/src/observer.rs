//! Per-sweep hook for diagnostics.
//!
//! The engine calls the installed observer once after every completed global
//! sweep, on whichever thread coordinates the run. Observers must not panic
//! while a banded run is in progress.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// How a relaxation was executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    Sequential,
    /// Contiguous row bands, one per worker.
    RowBands { workers: usize },
    /// Contiguous column bands, one per worker.
    ColumnBands { workers: usize },
}

impl ExecutionPath {
    pub fn workers(&self) -> usize {
        match *self {
            ExecutionPath::Sequential => 1,
            ExecutionPath::RowBands { workers } | ExecutionPath::ColumnBands { workers } => workers,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepEvent {
    /// 1-based number of the sweep that just finished.
    pub iteration: u64,
    /// Largest absolute node change of that sweep.
    pub max_change: f64,
    pub path: ExecutionPath,
}

pub trait SweepObserver: Send {
    fn on_sweep(&mut self, event: &SweepEvent);
}

impl<F> SweepObserver for F
where
    F: FnMut(&SweepEvent) + Send,
{
    fn on_sweep(&mut self, event: &SweepEvent) {
        self(event)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl SweepObserver for NoopObserver {
    fn on_sweep(&mut self, _event: &SweepEvent) {}
}

/// Emits a `trace!` event per sweep under the `plate_solver_core::sweep` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl SweepObserver for TracingObserver {
    fn on_sweep(&mut self, event: &SweepEvent) {
        trace!(
            target: "plate_solver_core::sweep",
            iteration = event.iteration,
            max_change = event.max_change,
            workers = event.path.workers(),
            "sweep complete"
        );
    }
}
