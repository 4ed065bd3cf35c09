use std::io::{self, Write};

use plate_solver_core::{ExecutionPath, PlateSolver, RunStats, SolverResult};
use serde::Serialize;

#[derive(Serialize)]
pub struct Report {
    pub node_x: usize,
    pub node_y: usize,

    pub iterations: u64,
    pub max_change: f64,
    pub duration_ns: u64,
    pub path: ExecutionPath,

    pub has_heat_source: bool,
    // one entry per row, north first
    pub temperatures: Vec<Vec<f64>>,
}

impl Report {
    pub fn new(solver: &PlateSolver, stats: &RunStats) -> SolverResult<Report> {
        let flat = solver.temperatures()?;
        let temperatures = flat.chunks_exact(solver.node_x()).map(<[f64]>::to_vec).collect();

        Ok(Report {
            node_x: solver.node_x(),
            node_y: solver.node_y(),
            iterations: stats.iterations,
            max_change: stats.max_change,
            duration_ns: u64::try_from(stats.duration.as_nanos()).unwrap_or(u64::MAX),
            path: stats.path,
            has_heat_source: solver.has_heat_source(),
            temperatures,
        })
    }
}

/// Plain console report: the grid, then iteration count and timing.
pub fn write_table<W: Write>(w: &mut W, solver: &PlateSolver, stats: &RunStats, precision: usize) -> io::Result<()> {
    writeln!(w, "{:.precision$}", solver.grid())?;
    writeln!(w, "Iterations: {}", stats.iterations)?;
    writeln!(w, "Max change: {:e}", stats.max_change)?;
    writeln!(w, "Time taken: {}ns", stats.duration.as_nanos())?;
    Ok(())
}
