//! Pairwise distance matrices between the rows of two feature matrices.

use super::Variant;
use crate::error::{KernelError, KernelResult};
use crate::parallel::WorkPool;
use crate::profiling::Profiler;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-feature distance term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Squared Euclidean distance: sum of `(a - b)^2`, no square root
    Euclidean,
    /// Manhattan distance: sum of `|a - b|`
    Cityblock,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Euclidean, Metric::Cityblock];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Cityblock => "cityblock",
        }
    }

    #[inline(always)]
    fn reduce_diff(self, diff: f64) -> f64 {
        match self {
            Metric::Euclidean => diff * diff,
            Metric::Cityblock => diff.abs(),
        }
    }

    #[inline(always)]
    fn term(self, a: f64, b: f64) -> f64 {
        self.reduce_diff(a - b)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Distance between every row of `x` (n x f) and every row of `y` (m x f),
/// returned as an n x m matrix.
pub fn distance_matrix(
    x: &DMatrix<f64>,
    y: &DMatrix<f64>,
    metric: Metric,
    variant: Variant,
    pool: Option<&WorkPool>,
) -> KernelResult<DMatrix<f64>> {
    check_shapes(x, y)?;
    let (n, m, features) = (x.nrows(), y.nrows(), x.ncols());
    if n == 0 || m == 0 || features == 0 {
        return Ok(DMatrix::zeros(n, m));
    }

    let out = match variant {
        Variant::Baseline => return Ok(distance_baseline(x, y, metric)),
        Variant::Vectorized => distance_broadcast(x, y, metric, None),
        Variant::Compiled => distance_compiled(x, y, metric),
        Variant::Parallel => {
            let pool = pool.ok_or_else(|| {
                KernelError::invalid_input("parallel variant requires a work pool")
            })?;
            distance_parallel(x, y, metric, pool)
        }
    };
    Ok(DMatrix::from_row_slice(n, m, &out))
}

/// Broadcast squared-Euclidean kernel with each phase recorded in `profiler`
pub fn euclidean_broadcast_profiled(
    x: &DMatrix<f64>,
    y: &DMatrix<f64>,
    profiler: &Profiler,
) -> KernelResult<DMatrix<f64>> {
    check_shapes(x, y)?;
    let (n, m, features) = (x.nrows(), y.nrows(), x.ncols());
    if n == 0 || m == 0 || features == 0 {
        return Ok(DMatrix::zeros(n, m));
    }
    let out = distance_broadcast(x, y, Metric::Euclidean, Some(profiler));
    Ok(profiler.section("assemble matrix", || DMatrix::from_row_slice(n, m, &out)))
}

fn check_shapes(x: &DMatrix<f64>, y: &DMatrix<f64>) -> KernelResult<()> {
    if x.ncols() != y.ncols() {
        return Err(KernelError::shape_mismatch(
            format!("{} features", x.ncols()),
            format!("{} features", y.ncols()),
        ));
    }
    Ok(())
}

fn distance_baseline(x: &DMatrix<f64>, y: &DMatrix<f64>, metric: Metric) -> DMatrix<f64> {
    let term: Box<dyn Fn(f64, f64) -> f64> = match metric {
        Metric::Euclidean => Box::new(|a: f64, b: f64| (a - b) * (a - b)),
        Metric::Cityblock => Box::new(|a: f64, b: f64| (a - b).abs()),
    };

    let mut out = DMatrix::zeros(x.nrows(), y.nrows());
    for i in 0..x.nrows() {
        for j in 0..y.nrows() {
            let mut acc = 0.0;
            for k in 0..x.ncols() {
                acc += term(x[(i, k)], y[(j, k)]);
            }
            out[(i, j)] = acc;
        }
    }
    out
}

fn timed<R, F: FnOnce() -> R>(profiler: Option<&Profiler>, name: &str, f: F) -> R {
    match profiler {
        Some(p) => p.section(name, f),
        None => f(),
    }
}

// Materializes the full n x m x f difference tensor, like array broadcasting.
fn distance_broadcast(
    x: &DMatrix<f64>,
    y: &DMatrix<f64>,
    metric: Metric,
    profiler: Option<&Profiler>,
) -> Vec<f64> {
    let features = x.ncols();
    let xt = x.transpose();
    let yt = y.transpose();

    let diff: Vec<f64> = timed(profiler, "broadcast difference", || {
        xt.as_slice()
            .chunks_exact(features)
            .flat_map(|xi| {
                yt.as_slice()
                    .chunks_exact(features)
                    .flat_map(move |yj| xi.iter().zip(yj).map(|(a, b)| a - b))
            })
            .collect()
    });

    let terms: Vec<f64> = timed(profiler, "elementwise term", || {
        diff.iter().map(|&d| metric.reduce_diff(d)).collect()
    });

    timed(profiler, "reduce features", || {
        terms
            .chunks_exact(features)
            .map(|t| t.iter().fold(0.0, |acc, v| acc + v))
            .collect()
    })
}

#[inline]
fn fill_rows(xt: &[f64], yt: &[f64], features: usize, metric: Metric, out: &mut [f64]) {
    let m = yt.len() / features;
    for (xi, row) in xt.chunks_exact(features).zip(out.chunks_mut(m)) {
        for (yj, slot) in yt.chunks_exact(features).zip(row.iter_mut()) {
            *slot = xi
                .iter()
                .zip(yj)
                .fold(0.0, |acc, (&a, &b)| acc + metric.term(a, b));
        }
    }
}

fn distance_compiled(x: &DMatrix<f64>, y: &DMatrix<f64>, metric: Metric) -> Vec<f64> {
    let features = x.ncols();
    let xt = x.transpose();
    let yt = y.transpose();
    let mut out = vec![0.0; x.nrows() * y.nrows()];
    fill_rows(xt.as_slice(), yt.as_slice(), features, metric, &mut out);
    out
}

fn distance_parallel(
    x: &DMatrix<f64>,
    y: &DMatrix<f64>,
    metric: Metric,
    pool: &WorkPool,
) -> Vec<f64> {
    let features = x.ncols();
    let m = y.nrows();
    let xt = x.transpose();
    let yt = y.transpose();
    let (xs, ys) = (xt.as_slice(), yt.as_slice());
    let chunk_rows = pool.config().chunk_rows.max(1);
    let mut out = vec![0.0; x.nrows() * m];

    pool.for_each_chunk(&mut out, m * chunk_rows, |k, chunk| {
        let first = k * chunk_rows * features;
        let rows = chunk.len() / m;
        fill_rows(
            &xs[first..first + rows * features],
            ys,
            features,
            metric,
            chunk,
        );
    });
    out
}
