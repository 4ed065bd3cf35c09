//! Band-partitioned Jacobi sweeps.
//!
//! Each worker owns a contiguous band of rows in both buffers. Per sweep it
//! snapshots its band, publishes the band's first and last rows as halos,
//! waits on a shared barrier, then relaxes its interior rows reading the
//! neighbouring halos. A second barrier lets one leader reduce the per-band
//! maxima into a single stop decision that every worker reads after a third
//! barrier. No lock is taken per node.
//!
//! Column bands are handled by transposing the grid, running row bands and
//! transposing back.

use std::any::Any;
use std::mem;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Barrier, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::grid::{Grid, relax_row, worst};
use crate::observer::{ExecutionPath, SweepEvent, SweepObserver};
use crate::solver::Relaxation;

pub(crate) fn relax_column_bands(
    grid: &mut Grid,
    epsilon: f64,
    max_iterations: u64,
    workers: usize,
    observer: &mut dyn SweepObserver,
) -> Relaxation {
    let mut transposed = grid.transposed();
    let outcome = run_bands(
        &mut transposed,
        epsilon,
        max_iterations,
        workers,
        ExecutionPath::ColumnBands { workers },
        observer,
    );
    *grid = transposed.transposed();
    outcome
}

pub(crate) fn relax_row_bands(
    grid: &mut Grid,
    epsilon: f64,
    max_iterations: u64,
    workers: usize,
    observer: &mut dyn SweepObserver,
) -> Relaxation {
    run_bands(
        grid,
        epsilon,
        max_iterations,
        workers,
        ExecutionPath::RowBands { workers },
        observer,
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Running,
    Converged,
    /// Cap reached, non-finite change, or the observer panicked.
    Stopped,
}

struct Control {
    iterations: u64,
    max_change: f64,
    status: Status,
    observer_panic: Option<Box<dyn Any + Send>>,
}

struct Halo {
    first: Mutex<Vec<f64>>,
    last: Mutex<Vec<f64>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_bands(
    grid: &mut Grid,
    epsilon: f64,
    max_iterations: u64,
    workers: usize,
    path: ExecutionPath,
    observer: &mut dyn SweepObserver,
) -> Relaxation {
    let nx = grid.node_x();
    let ny = grid.node_y();
    let bands = band_ranges(ny, workers);
    let count = bands.len();

    let (current, previous, fixed) = grid.buffers_mut();
    let current_bands = split_bands(current, nx, &bands);
    let previous_bands = split_bands(previous, nx, &bands);

    let halos: Vec<Halo> = (0..count)
        .map(|_| Halo {
            first: Mutex::new(vec![0.0; nx]),
            last: Mutex::new(vec![0.0; nx]),
        })
        .collect();
    let band_max = Mutex::new(vec![0.0f64; count]);
    let barrier = Barrier::new(count);
    let control = Mutex::new(Control {
        iterations: 0,
        max_change: epsilon,
        status: Status::Running,
        observer_panic: None,
    });
    let observer = Mutex::new(observer);

    thread::scope(|s| {
        let halos = &halos;
        let band_max = &band_max;
        let barrier = &barrier;
        let control = &control;
        let observer = &observer;

        for (i, ((cur, prev), rows)) in current_bands
            .into_iter()
            .zip(previous_bands)
            .zip(bands.iter().cloned())
            .enumerate()
        {
            s.spawn(move || {
                let mut above = vec![0.0f64; nx];
                let mut below = vec![0.0f64; nx];
                let height = rows.len();

                loop {
                    prev.copy_from_slice(&cur[..]);
                    lock(&halos[i].first).copy_from_slice(&prev[..nx]);
                    lock(&halos[i].last).copy_from_slice(&prev[(height - 1) * nx..]);

                    barrier.wait();

                    if i > 0 {
                        above.copy_from_slice(&lock(&halos[i - 1].last));
                    }
                    if i + 1 < count {
                        below.copy_from_slice(&lock(&halos[i + 1].first));
                    }

                    let mut local_max = 0.0f64;
                    for local in 0..height {
                        let y = rows.start + local;
                        if y == 0 || y == ny - 1 {
                            continue;
                        }
                        let up: &[f64] = if local == 0 {
                            &above
                        } else {
                            &prev[(local - 1) * nx..local * nx]
                        };
                        let down: &[f64] = if local + 1 == height {
                            &below
                        } else {
                            &prev[(local + 1) * nx..(local + 2) * nx]
                        };
                        let change = relax_row(
                            up,
                            &prev[local * nx..(local + 1) * nx],
                            down,
                            &fixed[y * nx..(y + 1) * nx],
                            &mut cur[local * nx..(local + 1) * nx],
                        );
                        local_max = worst(local_max, change);
                    }
                    lock(band_max)[i] = local_max;

                    if barrier.wait().is_leader() {
                        let global = lock(band_max).iter().copied().fold(0.0f64, worst);
                        let mut ctl = lock(control);
                        ctl.iterations += 1;
                        ctl.max_change = global;

                        let event = SweepEvent { iteration: ctl.iterations, max_change: global, path };
                        // a panicking observer must not leave the other workers on the barrier
                        let notified =
                            panic::catch_unwind(AssertUnwindSafe(|| lock(observer).on_sweep(&event)));

                        if let Err(payload) = notified {
                            ctl.observer_panic = Some(payload);
                            ctl.status = Status::Stopped;
                        } else if global < epsilon {
                            ctl.status = Status::Converged;
                        } else if !global.is_finite() || ctl.iterations >= max_iterations {
                            ctl.status = Status::Stopped;
                        }
                    }

                    barrier.wait();
                    if lock(control).status != Status::Running {
                        break;
                    }
                }
            });
        }
    });

    let ctl = control.into_inner().unwrap_or_else(PoisonError::into_inner);
    if let Some(payload) = ctl.observer_panic {
        panic::resume_unwind(payload);
    }
    Relaxation {
        iterations: ctl.iterations,
        max_change: ctl.max_change,
        converged: ctl.status == Status::Converged,
    }
}

/// Splits `len` rows into at most `parts` contiguous, non-empty bands.
fn band_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.clamp(1, len);
    let base = len / parts;
    let extra = len % parts;

    let mut out = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let size = base + usize::from(i < extra);
        out.push(start..start + size);
        start += size;
    }
    out
}

fn split_bands<'a>(mut data: &'a mut [f64], width: usize, bands: &[Range<usize>]) -> Vec<&'a mut [f64]> {
    let mut out = Vec::with_capacity(bands.len());
    for band in bands {
        let (head, tail) = mem::take(&mut data).split_at_mut(band.len() * width);
        out.push(head);
        data = tail;
    }
    out
}
