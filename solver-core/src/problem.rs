//! Self-contained description of a plate run, loadable from JSON.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SolverConfig;
use crate::error::{SolverError, SolverResult};
use crate::solver::{PlateSolver, RunStats};

/// Grid size, either as node counts or as plate lengths over node spacing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimensions {
    Nodes { node_x: usize, node_y: usize },
    Physical {
        length_x: f64,
        length_y: f64,
        spacing_x: f64,
        spacing_y: f64,
    },
}

impl Dimensions {
    /// Node counts; physical sizes give `floor(length / spacing)` per axis,
    /// tolerant of decimal spacings that are not exact in binary.
    pub fn node_counts(&self) -> SolverResult<(usize, usize)> {
        match *self {
            Dimensions::Nodes { node_x, node_y } => Ok((node_x, node_y)),
            Dimensions::Physical { length_x, length_y, spacing_x, spacing_y } => {
                Ok((axis_nodes("x", length_x, spacing_x)?, axis_nodes("y", length_y, spacing_y)?))
            }
        }
    }
}

fn axis_nodes(axis: &str, length: f64, spacing: f64) -> SolverResult<usize> {
    if !length.is_finite() || length <= 0.0 {
        return Err(SolverError::InvalidGeometry(format!(
            "length_{axis} must be finite and > 0, got {length}"
        )));
    }
    if !spacing.is_finite() || spacing <= 0.0 {
        return Err(SolverError::InvalidGeometry(format!(
            "spacing_{axis} must be finite and > 0, got {spacing}"
        )));
    }
    // a few ulps of slack so that 1.2 / 0.1 counts 12 nodes, not 11, while
    // never adding a whole node to an exact ratio
    let ratio = length / spacing;
    let nodes = (ratio + ratio * 4.0 * f64::EPSILON).floor();
    if nodes > usize::MAX as f64 {
        return Err(SolverError::InvalidGeometry(format!(
            "length_{axis} / spacing_{axis} is too large"
        )));
    }
    Ok(nodes as usize)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WallTemperatures {
    pub north: f64,
    pub east: f64,
    pub south: f64,
    pub west: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatSource {
    pub x: usize,
    pub y: usize,
    pub temperature: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlateProblem {
    pub dimensions: Dimensions,
    pub walls: WallTemperatures,
    #[serde(default)]
    pub heat_sources: Vec<HeatSource>,
    pub epsilon: f64,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl PlateProblem {
    /// Solver with walls and heat sources applied, not yet relaxed.
    ///
    /// Sources are applied in order after the walls, so a later entry for the
    /// same node wins.
    pub fn build(&self) -> SolverResult<PlateSolver> {
        let (node_x, node_y) = self.dimensions.node_counts()?;
        debug!(node_x, node_y, sources = self.heat_sources.len(), "building plate");

        let mut solver = PlateSolver::with_config(node_x, node_y, self.solver.clone())?;
        let w = self.walls;
        solver.set_boundary_temperatures(w.north, w.east, w.south, w.west);
        for src in &self.heat_sources {
            solver.set_heat_source(src.x, src.y, src.temperature)?;
        }
        Ok(solver)
    }

    pub fn solve(&self) -> SolverResult<(PlateSolver, RunStats)> {
        let mut solver = self.build()?;
        let stats = solver.calculate(self.epsilon)?;
        Ok((solver, stats))
    }
}
