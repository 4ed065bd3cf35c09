use std::fmt;

use tracing::debug;

use crate::error::{SolverError, SolverResult};

/// Node storage for a rectangular plate.
///
/// Both buffers are row-major, `node_y` rows of `node_x` columns. `current`
/// holds the latest iterate and `previous` the snapshot the stencil reads from.
#[derive(Clone, Debug)]
pub struct Grid {
    node_x: usize,
    node_y: usize,
    current: Vec<f64>,
    previous: Vec<f64>,
    fixed: Vec<bool>,
    heat_source: bool,
}

impl Grid {
    pub fn new(node_x: usize, node_y: usize) -> SolverResult<Grid> {
        if node_x < 3 {
            return Err(SolverError::InvalidDimension { axis: "node_x", value: node_x });
        }
        if node_y < 3 {
            return Err(SolverError::InvalidDimension { axis: "node_y", value: node_y });
        }
        let too_large = || SolverError::TooManyNodes { node_x, node_y };
        let size = node_x.checked_mul(node_y).ok_or_else(too_large)?;

        Ok(Grid {
            node_x,
            node_y,
            current: filled(size, 0.0).ok_or_else(too_large)?,
            previous: filled(size, 0.0).ok_or_else(too_large)?,
            fixed: filled(size, false).ok_or_else(too_large)?,
            heat_source: false,
        })
    }

    // ---- Accessors ----

    pub fn node_x(&self) -> usize {
        self.node_x
    }

    pub fn node_y(&self) -> usize {
        self.node_y
    }

    pub fn has_heat_source(&self) -> bool {
        self.heat_source
    }

    /// Raw value of the latest iterate, whether or not it has converged.
    pub fn value(&self, x: usize, y: usize) -> SolverResult<f64> {
        let idx = self.index(x, y)?;
        Ok(self.current[idx])
    }

    pub fn is_fixed(&self, x: usize, y: usize) -> SolverResult<bool> {
        let idx = self.index(x, y)?;
        Ok(self.fixed[idx])
    }

    pub fn values(&self) -> &[f64] {
        &self.current
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.current.chunks_exact(self.node_x)
    }

    fn index(&self, x: usize, y: usize) -> SolverResult<usize> {
        if x >= self.node_x || y >= self.node_y {
            return Err(SolverError::OutOfRange {
                x,
                y,
                node_x: self.node_x,
                node_y: self.node_y,
            });
        }
        Ok(y * self.node_x + x)
    }

    // ---- Boundary and sources ----

    /// Pins all four edges and reseeds every free interior node with the mean
    /// of the four wall temperatures.
    ///
    /// Columns are written before rows, so the four corners carry the north
    /// and south values.
    pub fn set_boundary_temperatures(&mut self, north: f64, east: f64, south: f64, west: f64) {
        let (nx, ny) = (self.node_x, self.node_y);

        for y in 0..ny {
            let row = y * nx;
            self.pin(row, west);
            self.pin(row + nx - 1, east);
        }
        for x in 0..nx {
            self.pin(x, north);
            self.pin((ny - 1) * nx + x, south);
        }

        // quarter each term first so finite walls never overflow the sum
        let seed = north * 0.25 + east * 0.25 + south * 0.25 + west * 0.25;
        for y in 1..(ny - 1) {
            let row = y * nx;
            for x in 1..(nx - 1) {
                let i = row + x;
                if !self.fixed[i] {
                    self.current[i] = seed;
                }
            }
        }

        debug!(north, east, south, west, seed, "wall temperatures set");
    }

    pub fn set_heat_source(&mut self, x: usize, y: usize, temperature: f64) -> SolverResult<()> {
        let idx = self.index(x, y)?;
        self.pin(idx, temperature);
        self.heat_source = true;
        debug!(x, y, temperature, "heat source set");
        Ok(())
    }

    fn pin(&mut self, idx: usize, value: f64) {
        self.current[idx] = value;
        self.fixed[idx] = true;
    }

    // ---- Relaxation support ----

    /// One Jacobi sweep over the whole interior. Returns the largest change,
    /// or NaN/infinity if any node left the finite range.
    pub(crate) fn sweep(&mut self) -> f64 {
        self.previous.copy_from_slice(&self.current);

        let n = self.node_x;
        let mut max_change = 0.0f64;
        for y in 1..(self.node_y - 1) {
            let row = y * n;
            let change = relax_row(
                &self.previous[row - n..row],
                &self.previous[row..row + n],
                &self.previous[row + n..row + 2 * n],
                &self.fixed[row..row + n],
                &mut self.current[row..row + n],
            );
            max_change = worst(max_change, change);
        }
        max_change
    }

    pub(crate) fn buffers_mut(&mut self) -> (&mut [f64], &mut [f64], &[bool]) {
        (&mut self.current, &mut self.previous, &self.fixed)
    }

    /// Same plate with rows and columns swapped.
    pub(crate) fn transposed(&self) -> Grid {
        Grid {
            node_x: self.node_y,
            node_y: self.node_x,
            current: transpose(&self.current, self.node_x, self.node_y),
            previous: transpose(&self.previous, self.node_x, self.node_y),
            fixed: transpose(&self.fixed, self.node_x, self.node_y),
            heat_source: self.heat_source,
        }
    }
}

/// Five-point update of one interior row from the previous sweep.
///
/// `above`, `row` and `below` are previous-sweep rows, `out` is the same row
/// in the current buffer. Fixed nodes and the two edge columns are left alone.
/// Terms are quartered before summing, grouped as `(n + s) + (w + e)`, which
/// is unchanged when the grid is transposed.
pub(crate) fn relax_row(above: &[f64], row: &[f64], below: &[f64], fixed: &[bool], out: &mut [f64]) -> f64 {
    let n = row.len();
    let mut max_change = 0.0f64;

    for x in 1..(n - 1) {
        if fixed[x] {
            continue;
        }
        let v = (above[x] * 0.25 + below[x] * 0.25) + (row[x - 1] * 0.25 + row[x + 1] * 0.25);
        out[x] = v;
        max_change = worst(max_change, (row[x] - v).abs());
    }
    max_change
}

/// Larger of two changes, letting NaN through instead of dropping it.
pub(crate) fn worst(a: f64, b: f64) -> f64 {
    if a.is_nan() || b <= a { a } else { b }
}

fn filled<T: Clone>(size: usize, value: T) -> Option<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(size).ok()?;
    v.resize(size, value);
    Some(v)
}

fn transpose<T: Copy>(src: &[T], width: usize, height: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(src.len());
    for x in 0..width {
        for y in 0..height {
            out.push(src[y * width + x]);
        }
    }
    out
}

impl fmt::Display for Grid {
    /// One row per line, values separated by `", "`. Honors `{:.N}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for (x, v) in row.iter().enumerate() {
                if x > 0 {
                    f.write_str(", ")?;
                }
                match f.precision() {
                    Some(p) => write!(f, "{v:.p$}")?,
                    None => write!(f, "{v}")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
