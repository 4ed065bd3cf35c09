use thiserror::Error;

pub type SolverResult<T> = Result<T, SolverError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// A grid needs at least one interior row and column.
    #[error("{axis} must be >= 3, got {value}")]
    InvalidDimension { axis: &'static str, value: usize },

    #[error("a {node_x}x{node_y} grid does not fit in memory")]
    TooManyNodes { node_x: usize, node_y: usize },

    #[error("node ({x}, {y}) is outside the {node_x}x{node_y} grid")]
    OutOfRange {
        x: usize,
        y: usize,
        node_x: usize,
        node_y: usize,
    },

    /// Reads are only valid after a relaxation completed since the last mutation.
    #[error("temperatures are stale: call calculate() after changing walls or heat sources")]
    StaleRead,

    #[error("epsilon must be finite and > 0, got {0}")]
    InvalidTolerance(f64),

    /// Also raised when a sweep produces a non-finite change.
    #[error("no convergence after {iterations} sweeps (last max change {max_change:e})")]
    DidNotConverge { iterations: u64, max_change: f64 },

    #[error("invalid plate geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid solver config: {0}")]
    InvalidConfig(String),
}
