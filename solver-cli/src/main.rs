mod report;

use clap::Parser;
use plate_solver_core::{
    DEFAULT_MAX_ITERATIONS, Dimensions, HeatSource, PlateProblem, SolverConfig, TracingObserver,
    WallTemperatures,
};
use report::{Report, write_table};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_EPSILON: f64 = 1e-7;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON plate description; replaces the geometry, wall and source flags.
    /// --epsilon, --threads, --workers and --max-iterations still override it.
    #[arg(
        long,
        conflicts_with_all = [
            "nodes_x", "nodes_y", "length_x", "north", "east", "south", "west", "sources",
        ]
    )]
    config: Option<PathBuf>,

    /// Nodes along x (including both walls)
    #[arg(long, default_value_t = 12)]
    nodes_x: usize,

    /// Nodes along y (including both walls)
    #[arg(long, default_value_t = 12)]
    nodes_y: usize,

    /// Plate length along x; with the spacing flags replaces --nodes-x/--nodes-y
    #[arg(long, requires_all = ["length_y", "spacing_x", "spacing_y"])]
    length_x: Option<f64>,

    #[arg(long, requires = "length_x")]
    length_y: Option<f64>,

    /// Distance between nodes along x
    #[arg(long, requires = "length_x")]
    spacing_x: Option<f64>,

    /// Distance between nodes along y
    #[arg(long, requires = "length_x")]
    spacing_y: Option<f64>,

    #[arg(long, default_value_t = 500.0)]
    north: f64,

    #[arg(long, default_value_t = 100.0)]
    east: f64,

    #[arg(long, default_value_t = 100.0)]
    south: f64,

    #[arg(long, default_value_t = 100.0)]
    west: f64,

    /// Heat source as "x,y,temperature" (repeatable)
    #[arg(long = "source", value_parser = parse_source)]
    sources: Vec<HeatSource>,

    /// Convergence tolerance on the largest per-node change [default: 1e-7]
    #[arg(long)]
    epsilon: Option<f64>,

    /// Allow banded multi-threaded sweeps
    #[arg(long)]
    threads: bool,

    /// Worker count (defaults to available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Sweep cap [default: 1000000]
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Print a JSON report instead of the grid
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to this file
    #[arg(long)]
    out: Option<PathBuf>,

    /// Decimals in the printed grid
    #[arg(long, default_value_t = 4)]
    precision: usize,
}

impl Args {
    fn problem(&self) -> Result<PlateProblem, Box<dyn std::error::Error>> {
        if let Some(path) = &self.config {
            let text = fs::read_to_string(path)?;
            let mut problem: PlateProblem = serde_json::from_str(&text)?;
            problem.solver.use_threads |= self.threads;
            if let Some(epsilon) = self.epsilon {
                problem.epsilon = epsilon;
            }
            if let Some(max_iterations) = self.max_iterations {
                problem.solver.max_iterations = max_iterations;
            }
            if self.workers.is_some() {
                problem.solver.workers = self.workers;
            }
            return Ok(problem);
        }

        let dimensions = match (self.length_x, self.length_y, self.spacing_x, self.spacing_y) {
            (Some(length_x), Some(length_y), Some(spacing_x), Some(spacing_y)) => {
                Dimensions::Physical { length_x, length_y, spacing_x, spacing_y }
            }
            _ => Dimensions::Nodes { node_x: self.nodes_x, node_y: self.nodes_y },
        };

        Ok(PlateProblem {
            dimensions,
            walls: WallTemperatures {
                north: self.north,
                east: self.east,
                south: self.south,
                west: self.west,
            },
            heat_sources: self.sources.clone(),
            epsilon: self.epsilon.unwrap_or(DEFAULT_EPSILON),
            solver: SolverConfig {
                use_threads: self.threads,
                max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
                workers: self.workers,
                ..SolverConfig::default()
            },
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let problem = args.problem()?;

    let mut solver = problem.build()?;
    solver.set_observer(TracingObserver);
    info!(
        node_x = solver.node_x(),
        node_y = solver.node_y(),
        sources = problem.heat_sources.len(),
        "plate ready"
    );

    let stats = solver.calculate(problem.epsilon)?;
    let report = Report::new(&solver, &stats)?;

    if let Some(path) = &args.out {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, &report)?;
        w.write_all(b"\n")?;
        w.flush()?;
        info!(path = %path.display(), "report written");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        out.write_all(b"\n")?;
    } else {
        write_table(&mut out, &solver, &stats, args.precision)?;
    }
    out.flush()?;

    Ok(())
}

fn parse_source(s: &str) -> Result<HeatSource, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, t] = parts.as_slice() else {
        return Err(format!("expected x,y,temperature, got {s:?}"));
    };
    Ok(HeatSource {
        x: x.parse().map_err(|e| format!("bad x {x:?}: {e}"))?,
        y: y.parse().map_err(|e| format!("bad y {y:?}: {e}"))?,
        temperature: t.parse().map_err(|e| format!("bad temperature {t:?}: {e}"))?,
    })
}
