use std::sync::{Arc, Mutex};

use approx::{assert_abs_diff_eq, assert_relative_eq};
use plate_solver_core::{
    ExecutionPath, PlateProblem, PlateSolver, SolverConfig, SolverError, SweepEvent, TracingObserver,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn hot_north_plate(config: SolverConfig) -> PlateSolver {
    let mut s = PlateSolver::with_config(12, 12, config).unwrap();
    s.set_boundary_temperatures(500.0, 100.0, 100.0, 100.0);
    s
}

#[test]
fn hot_north_wall_gives_smooth_bounded_field() {
    init_tracing();
    let mut s = hot_north_plate(SolverConfig::default());
    s.set_observer(TracingObserver);
    let stats = s.calculate(1e-7).unwrap();
    assert!(stats.iterations > 1);
    assert!(stats.max_change < 1e-7);

    for y in 1..11 {
        for x in 1..11 {
            let t = s.temperature(x, y).unwrap();
            assert!((100.0..=500.0).contains(&t), "({x}, {y}) = {t}");
            // mirror symmetry about the vertical centre line
            assert_eq!(t, s.temperature(11 - x, y).unwrap());
        }
    }

    // rows near the hot wall are warmer
    for y in 1..10 {
        assert!(s.temperature(5, y).unwrap() > s.temperature(5, y + 1).unwrap());
    }
    assert!(s.temperature(1, 1).unwrap() > s.temperature(1, 10).unwrap());
    assert!(s.temperature(5, 1).unwrap() > 300.0);
    assert!(s.temperature(5, 10).unwrap() < 130.0);
}

#[test]
fn iteration_count_is_reproducible() {
    let a = hot_north_plate(SolverConfig::default()).calculate(1e-7).unwrap();
    let b = hot_north_plate(SolverConfig::default()).calculate(1e-7).unwrap();
    assert_eq!(a.iterations, b.iterations);
    assert_eq!(a.max_change, b.max_change);
}

#[test]
fn interior_stays_within_wall_extremes() {
    let mut s = PlateSolver::new(15, 9).unwrap();
    s.set_boundary_temperatures(20.0, 85.0, -10.0, 40.0);
    s.calculate(1e-9).unwrap();

    for y in 1..8 {
        for x in 1..14 {
            let t = s.temperature(x, y).unwrap();
            assert!((-10.0..=85.0).contains(&t), "({x}, {y}) = {t}");
        }
    }
}

#[test]
fn sweep_changes_never_grow() {
    let history = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&history);

    let mut s = PlateSolver::new(16, 11).unwrap();
    s.set_observer(move |e: &SweepEvent| sink.lock().unwrap().push(e.max_change));
    s.set_boundary_temperatures(250.0, 30.0, 90.0, 0.0);
    s.set_heat_source(7, 5, 400.0).unwrap();
    let stats = s.calculate(1e-8).unwrap();

    let history = history.lock().unwrap();
    assert_eq!(history.len() as u64, stats.iterations);
    for pair in history.windows(2) {
        assert!(pair[1] <= pair[0] * (1.0 + 1e-9) + 1e-12, "{} -> {}", pair[0], pair[1]);
    }
}

#[test]
fn fixed_nodes_keep_assigned_values() {
    let mut s = PlateSolver::new(10, 10).unwrap();
    s.set_boundary_temperatures(60.0, 70.0, 80.0, 90.0);
    s.set_heat_source(3, 4, 1000.0).unwrap();
    s.set_heat_source(9, 5, -40.0).unwrap();
    s.calculate(1e-6).unwrap();

    let grid = s.grid();
    for y in 0..10 {
        for x in 0..10 {
            if !grid.is_fixed(x, y).unwrap() {
                continue;
            }
            let expected = match (x, y) {
                (3, 4) => 1000.0,
                (9, 5) => -40.0,
                (_, 0) => 60.0,
                (_, 9) => 80.0,
                (9, _) => 70.0,
                (0, _) => 90.0,
                _ => panic!("unexpected fixed node ({x}, {y})"),
            };
            assert_eq!(s.temperature(x, y).unwrap(), expected);
        }
    }

    // the source heats its neighbours
    let near = s.temperature(4, 4).unwrap();
    assert!(near > 200.0 && near < 1000.0);
}

#[test]
fn hot_source_in_cold_plate() {
    let mut s = PlateSolver::new(9, 9).unwrap();
    s.set_boundary_temperatures(0.0, 0.0, 0.0, 0.0);
    s.set_heat_source(4, 4, 100.0).unwrap();
    s.calculate(1e-10).unwrap();

    let n = s.temperature(4, 3).unwrap();
    assert_relative_eq!(n, s.temperature(4, 5).unwrap(), max_relative = 1e-9);
    assert_relative_eq!(n, s.temperature(3, 4).unwrap(), max_relative = 1e-9);
    assert!(n > s.temperature(4, 1).unwrap());
    assert!(s.temperature(1, 1).unwrap() > 0.0);
}

#[test]
fn banded_runs_match_sequential() {
    let mut seq = hot_north_plate(SolverConfig::default());
    let expected = seq.calculate(1e-7).unwrap();

    let config = SolverConfig { use_threads: true, workers: Some(2), ..Default::default() };
    let mut par = hot_north_plate(config);
    let got = par.calculate(1e-7).unwrap();

    assert_eq!(got.path, ExecutionPath::RowBands { workers: 2 });
    assert_eq!(got.iterations, expected.iterations);
    assert_eq!(par.temperatures().unwrap(), seq.temperatures().unwrap());
}

#[test]
fn wide_plates_band_by_column() {
    let build = |config| {
        let mut s = PlateSolver::with_config(40, 6, config).unwrap();
        s.set_boundary_temperatures(10.0, 300.0, 10.0, 10.0);
        s.set_heat_source(25, 3, 150.0).unwrap();
        s
    };
    let mut seq = build(SolverConfig::default());
    let mut par = build(SolverConfig { use_threads: true, workers: Some(3), ..Default::default() });

    let a = seq.calculate(1e-8).unwrap();
    let b = par.calculate(1e-8).unwrap();

    assert_eq!(b.path, ExecutionPath::ColumnBands { workers: 3 });
    assert_eq!(a.iterations, b.iterations);
    for (x, y) in seq.temperatures().unwrap().iter().zip(par.temperatures().unwrap()) {
        assert_abs_diff_eq!(*x, y);
    }
}

#[test]
fn problem_loads_from_json() {
    let json = r#"{
        "dimensions": { "physical": { "length_x": 1.2, "length_y": 0.6, "spacing_x": 0.1, "spacing_y": 0.1 } },
        "walls": { "north": 500.0, "east": 100.0, "south": 100.0, "west": 100.0 },
        "heat_sources": [ { "x": 4, "y": 2, "temperature": 250.0 } ],
        "epsilon": 1e-6,
        "solver": { "max_iterations": 50000 }
    }"#;
    let problem: PlateProblem = serde_json::from_str(json).unwrap();
    assert!(!problem.solver.use_threads);

    let (solver, stats) = problem.solve().unwrap();
    assert_eq!((solver.node_x(), solver.node_y()), (12, 6));
    assert_eq!(solver.temperature(4, 2).unwrap(), 250.0);
    assert!(stats.iterations > 0);
    assert_eq!(solver.iteration_count(), stats.iterations);
}

#[test]
fn nan_tolerance_is_rejected_not_looped() {
    let mut s = hot_north_plate(SolverConfig::default());
    assert!(matches!(s.calculate(f64::NAN), Err(SolverError::InvalidTolerance(_))));
}
