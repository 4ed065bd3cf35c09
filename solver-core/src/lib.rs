//! Steady-state temperature field of a rectangular plate.
//!
//! The plate is a uniform grid with fixed wall temperatures and optional
//! pinned interior nodes. [`PlateSolver::calculate`] runs Jacobi relaxation of
//! the discrete Laplace equation until the largest per-node change between
//! sweeps falls below the requested tolerance.

mod config;
mod error;
mod grid;
mod observer;
mod parallel;
mod problem;
mod solver;

pub use config::{DEFAULT_MAX_ITERATIONS, DEFAULT_PARALLEL_THRESHOLD_FACTOR, SolverConfig};
pub use error::{SolverError, SolverResult};
pub use grid::Grid;
pub use observer::{ExecutionPath, NoopObserver, SweepEvent, SweepObserver, TracingObserver};
pub use problem::{Dimensions, HeatSource, PlateProblem, WallTemperatures};
pub use solver::{PlateSolver, RunStats};
