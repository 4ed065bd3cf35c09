use std::num::NonZeroUsize;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

pub const DEFAULT_MAX_ITERATIONS: u64 = 1_000_000;
pub const DEFAULT_PARALLEL_THRESHOLD_FACTOR: usize = 4;

/// Knobs for a relaxation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Allow the banded multi-worker path.
    pub use_threads: bool,
    /// Sweeps allowed before giving up with `DidNotConverge`.
    pub max_iterations: u64,
    /// Worker count; `None` uses the available hardware parallelism.
    pub workers: Option<usize>,
    /// Banding starts only when the longer grid axis exceeds `workers * factor`.
    pub parallel_threshold_factor: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            use_threads: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            workers: None,
            parallel_threshold_factor: DEFAULT_PARALLEL_THRESHOLD_FACTOR,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> SolverResult<()> {
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidConfig("max_iterations must be > 0".into()));
        }
        if self.workers == Some(0) {
            return Err(SolverError::InvalidConfig("workers must be > 0".into()));
        }
        if self.parallel_threshold_factor == 0 {
            return Err(SolverError::InvalidConfig(
                "parallel_threshold_factor must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn resolve_workers(&self) -> usize {
        self.workers
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, NonZeroUsize::get))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = SolverConfig::default();
        assert!(c.validate().is_ok());
        assert!(!c.use_threads);
        assert!(c.resolve_workers() >= 1);
    }

    #[test]
    fn rejects_zero_values() {
        let c = SolverConfig { workers: Some(0), ..Default::default() };
        assert!(matches!(c.validate(), Err(SolverError::InvalidConfig(_))));

        let c = SolverConfig { max_iterations: 0, ..Default::default() };
        assert!(c.validate().is_err());

        let c = SolverConfig { parallel_threshold_factor: 0, ..Default::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn explicit_workers_win() {
        let c = SolverConfig { workers: Some(3), ..Default::default() };
        assert_eq!(c.resolve_workers(), 3);
    }
}
