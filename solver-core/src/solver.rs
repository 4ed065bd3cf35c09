use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::SolverConfig;
use crate::error::{SolverError, SolverResult};
use crate::grid::Grid;
use crate::observer::{ExecutionPath, NoopObserver, SweepEvent, SweepObserver};
use crate::parallel;

/// Outcome of one completed relaxation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RunStats {
    pub iterations: u64,
    pub max_change: f64,
    pub duration: Duration,
    pub path: ExecutionPath,
}

pub(crate) struct Relaxation {
    pub(crate) iterations: u64,
    pub(crate) max_change: f64,
    pub(crate) converged: bool,
}

/// Steady-state solver for a plate with Dirichlet walls and pinned sources.
///
/// Any change to walls or sources drops the converged state, and reads fail
/// with [`SolverError::StaleRead`] until [`PlateSolver::calculate`] succeeds
/// again.
pub struct PlateSolver {
    grid: Grid,
    config: SolverConfig,
    observer: Box<dyn SweepObserver>,
    converged: bool,
    stats: Option<RunStats>,
}

impl PlateSolver {
    pub fn new(node_x: usize, node_y: usize) -> SolverResult<PlateSolver> {
        Self::with_config(node_x, node_y, SolverConfig::default())
    }

    pub fn with_config(node_x: usize, node_y: usize, config: SolverConfig) -> SolverResult<PlateSolver> {
        config.validate()?;
        Ok(PlateSolver {
            grid: Grid::new(node_x, node_y)?,
            config,
            observer: Box::new(NoopObserver),
            converged: false,
            stats: None,
        })
    }

    // ---- Parameters ----

    pub fn set_use_threads(&mut self, choice: bool) {
        self.config.use_threads = choice;
    }

    pub fn use_threads(&self) -> bool {
        self.config.use_threads
    }

    pub fn set_max_iterations(&mut self, max: u64) -> SolverResult<()> {
        if max == 0 {
            return Err(SolverError::InvalidConfig("max_iterations must be > 0".into()));
        }
        self.config.max_iterations = max;
        Ok(())
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_observer<O: SweepObserver + 'static>(&mut self, observer: O) {
        self.observer = Box::new(observer);
    }

    // ---- Boundary and sources ----

    pub fn set_boundary_temperatures(&mut self, north: f64, east: f64, south: f64, west: f64) {
        self.grid.set_boundary_temperatures(north, east, south, west);
        self.invalidate();
    }

    pub fn set_heat_source(&mut self, x: usize, y: usize, temperature: f64) -> SolverResult<()> {
        self.grid.set_heat_source(x, y, temperature)?;
        self.invalidate();
        Ok(())
    }

    fn invalidate(&mut self) {
        self.converged = false;
        self.stats = None;
    }

    // ---- Accessors ----

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn node_x(&self) -> usize {
        self.grid.node_x()
    }

    pub fn node_y(&self) -> usize {
        self.grid.node_y()
    }

    pub fn has_heat_source(&self) -> bool {
        self.grid.has_heat_source()
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    pub fn stats(&self) -> Option<&RunStats> {
        self.stats.as_ref()
    }

    pub fn iteration_count(&self) -> u64 {
        self.stats.map_or(0, |s| s.iterations)
    }

    /// Wall-clock time of the last completed relaxation, zero before the first.
    pub fn duration(&self) -> Duration {
        self.stats.map_or(Duration::ZERO, |s| s.duration)
    }

    pub fn last_max_change(&self) -> Option<f64> {
        self.stats.map(|s| s.max_change)
    }

    pub fn temperature(&self, x: usize, y: usize) -> SolverResult<f64> {
        let value = self.grid.value(x, y)?;
        if !self.converged {
            return Err(SolverError::StaleRead);
        }
        Ok(value)
    }

    /// Row-major copy of the converged field.
    pub fn temperatures(&self) -> SolverResult<Vec<f64>> {
        if !self.converged {
            return Err(SolverError::StaleRead);
        }
        Ok(self.grid.values().to_vec())
    }

    // ---- Core: relax until the largest change drops below epsilon ----

    /// Runs Jacobi sweeps until the largest per-node change is below `epsilon`.
    ///
    /// Returns the stored stats without sweeping when nothing changed since the
    /// last successful run. Hitting the iteration cap leaves the partially
    /// relaxed field in place and reports [`SolverError::DidNotConverge`].
    pub fn calculate(&mut self, epsilon: f64) -> SolverResult<RunStats> {
        if self.converged {
            if let Some(stats) = self.stats {
                return Ok(stats);
            }
        }
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(SolverError::InvalidTolerance(epsilon));
        }
        self.config.validate()?;

        let path = self.plan();
        info!(
            node_x = self.grid.node_x(),
            node_y = self.grid.node_y(),
            epsilon,
            workers = path.workers(),
            "relaxation started"
        );

        let start = Instant::now();
        let outcome = match path {
            ExecutionPath::Sequential => self.relax_sequential(epsilon),
            ExecutionPath::RowBands { workers } => parallel::relax_row_bands(
                &mut self.grid,
                epsilon,
                self.config.max_iterations,
                workers,
                self.observer.as_mut(),
            ),
            ExecutionPath::ColumnBands { workers } => parallel::relax_column_bands(
                &mut self.grid,
                epsilon,
                self.config.max_iterations,
                workers,
                self.observer.as_mut(),
            ),
        };
        let duration = start.elapsed();

        if !outcome.converged {
            warn!(
                iterations = outcome.iterations,
                max_change = outcome.max_change,
                "relaxation stopped before convergence"
            );
            return Err(SolverError::DidNotConverge {
                iterations: outcome.iterations,
                max_change: outcome.max_change,
            });
        }

        let stats = RunStats {
            iterations: outcome.iterations,
            max_change: outcome.max_change,
            duration,
            path,
        };
        self.converged = true;
        self.stats = Some(stats);

        info!(
            iterations = stats.iterations,
            duration_ns = stats.duration.as_nanos() as u64,
            "relaxation converged"
        );
        Ok(stats)
    }

    fn plan(&self) -> ExecutionPath {
        if !self.config.use_threads {
            return ExecutionPath::Sequential;
        }
        let nx = self.grid.node_x();
        let ny = self.grid.node_y();
        let workers = self.config.resolve_workers();

        if workers < 2 || nx.max(ny) <= workers.saturating_mul(self.config.parallel_threshold_factor) {
            ExecutionPath::Sequential
        } else if ny >= nx {
            ExecutionPath::RowBands { workers: workers.min(ny) }
        } else {
            ExecutionPath::ColumnBands { workers: workers.min(nx) }
        }
    }

    fn relax_sequential(&mut self, epsilon: f64) -> Relaxation {
        let mut iterations = 0u64;
        let mut max_change = epsilon;

        while max_change >= epsilon {
            if iterations >= self.config.max_iterations {
                return Relaxation { iterations, max_change, converged: false };
            }
            max_change = self.grid.sweep();
            iterations += 1;
            self.observer.on_sweep(&SweepEvent {
                iteration: iterations,
                max_change,
                path: ExecutionPath::Sequential,
            });
            if !max_change.is_finite() {
                return Relaxation { iterations, max_change, converged: false };
            }
        }

        Relaxation { iterations, max_change, converged: true }
    }
}

impl fmt::Debug for PlateSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlateSolver")
            .field("node_x", &self.grid.node_x())
            .field("node_y", &self.grid.node_y())
            .field("config", &self.config)
            .field("converged", &self.converged)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
