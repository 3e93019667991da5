//! Julia set iteration counts.
//!
//! Each pixel maps to a starting point `z0` in the complex plane and records
//! how many applications of `z <- z^2 + c` it survives before `|z| > 2`,
//! capped at `max_iter`. Pixels are independent of each other.

use super::Variant;
use crate::error::{KernelError, KernelResult};
use crate::parallel::WorkPool;
use nalgebra::{Complex, DMatrix};
use serde::{Deserialize, Serialize};

/// Grid and recurrence parameters for a Julia set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JuliaParams {
    /// Pixels along the real axis
    pub width: usize,
    /// Pixels along the imaginary axis
    pub height: usize,
    /// Inclusive real-axis bounds
    pub x_range: (f64, f64),
    /// Inclusive imaginary-axis bounds
    pub y_range: (f64, f64),
    pub c_re: f64,
    pub c_im: f64,
    /// Iteration cap per pixel
    pub max_iter: u32,
}

impl Default for JuliaParams {
    fn default() -> Self {
        Self {
            width: 600,
            height: 400,
            x_range: (-1.5, 1.5),
            y_range: (-1.0, 1.0),
            c_re: -0.8,
            c_im: 0.156,
            max_iter: 300,
        }
    }
}

impl JuliaParams {
    /// Small grid used by tests and quick runs
    pub fn small() -> Self {
        Self {
            width: 120,
            height: 80,
            max_iter: 100,
            ..Self::default()
        }
    }

    pub fn c(&self) -> Complex<f64> {
        Complex::new(self.c_re, self.c_im)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(KernelError::invalid_input(format!(
                "julia grid must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.max_iter == 0 {
            return Err(KernelError::invalid_input("max_iter must be positive"));
        }
        let finite = [
            self.x_range.0,
            self.x_range.1,
            self.y_range.0,
            self.y_range.1,
            self.c_re,
            self.c_im,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(KernelError::invalid_input(
                "julia bounds and constant must be finite",
            ));
        }
        Ok(())
    }
}

/// Compute the iteration-count grid (rows = imaginary axis, columns = real
/// axis).
///
/// All variants produce identical grids for identical parameters.
pub fn julia_set(
    params: &JuliaParams,
    variant: Variant,
    pool: Option<&WorkPool>,
) -> KernelResult<DMatrix<u32>> {
    params.validate()?;

    let counts = match variant {
        Variant::Baseline => return Ok(julia_baseline(params)),
        Variant::Vectorized => julia_vectorized(params),
        Variant::Compiled => julia_compiled(params),
        Variant::Parallel => {
            let pool = pool.ok_or_else(|| {
                KernelError::invalid_input("parallel variant requires a work pool")
            })?;
            julia_parallel(params, pool)
        }
    };

    Ok(DMatrix::from_row_slice(params.height, params.width, &counts))
}

/// Evenly spaced coordinate `index` of `n` points spanning `[min, max]`
#[inline]
fn coordinate(min: f64, max: f64, n: usize, index: usize) -> f64 {
    if n == 1 {
        min
    } else {
        min + index as f64 * ((max - min) / (n - 1) as f64)
    }
}

fn axis(range: (f64, f64), n: usize) -> Vec<f64> {
    (0..n).map(|i| coordinate(range.0, range.1, n, i)).collect()
}

fn escape_complex(z0: Complex<f64>, c: Complex<f64>, max_iter: u32) -> u32 {
    let mut z = z0;
    let mut n = 0;
    while n < max_iter && z.norm_sqr() <= 4.0 {
        z = z * z + c;
        n += 1;
    }
    n
}

// Same arithmetic as `escape_complex`, spelled out on the components.
#[inline(always)]
fn escape_scalar(mut zr: f64, mut zi: f64, cr: f64, ci: f64, max_iter: u32) -> u32 {
    let mut n = 0;
    while n < max_iter {
        let zr2 = zr * zr;
        let zi2 = zi * zi;
        if zr2 + zi2 > 4.0 {
            break;
        }
        let cross = zr * zi;
        zi = cross + cross + ci;
        zr = zr2 - zi2 + cr;
        n += 1;
    }
    n
}

fn julia_baseline(params: &JuliaParams) -> DMatrix<u32> {
    let c = params.c();
    let mut grid = DMatrix::<u32>::zeros(params.height, params.width);
    for row in 0..params.height {
        for col in 0..params.width {
            let x = coordinate(params.x_range.0, params.x_range.1, params.width, col);
            let y = coordinate(params.y_range.0, params.y_range.1, params.height, row);
            grid[(row, col)] = escape_complex(Complex::new(x, y), c, params.max_iter);
        }
    }
    grid
}

fn julia_vectorized(params: &JuliaParams) -> Vec<u32> {
    let xs = axis(params.x_range, params.width);
    let ys = axis(params.y_range, params.height);
    let c = params.c();

    let mut z: Vec<Complex<f64>> = ys
        .iter()
        .flat_map(|&y| xs.iter().map(move |&x| Complex::new(x, y)))
        .collect();
    let mut counts = vec![0u32; z.len()];
    let mut active = vec![true; z.len()];

    for _ in 0..params.max_iter {
        let norms: Vec<f64> = z.iter().map(|v| v.norm_sqr()).collect();
        for (flag, norm) in active.iter_mut().zip(&norms) {
            *flag = *flag && *norm <= 4.0;
        }
        if !active.iter().any(|&a| a) {
            break;
        }
        for i in 0..z.len() {
            if active[i] {
                z[i] = z[i] * z[i] + c;
                counts[i] += 1;
            }
        }
    }
    counts
}

fn fill_rows(params: &JuliaParams, xs: &[f64], ys: &[f64], first_row: usize, out: &mut [u32]) {
    for (offset, row) in out.chunks_mut(params.width).enumerate() {
        let y = ys[first_row + offset];
        for (px, &x) in row.iter_mut().zip(xs) {
            *px = escape_scalar(x, y, params.c_re, params.c_im, params.max_iter);
        }
    }
}

fn julia_compiled(params: &JuliaParams) -> Vec<u32> {
    let xs = axis(params.x_range, params.width);
    let ys = axis(params.y_range, params.height);
    let mut counts = vec![0u32; params.width * params.height];
    fill_rows(params, &xs, &ys, 0, &mut counts);
    counts
}

fn julia_parallel(params: &JuliaParams, pool: &WorkPool) -> Vec<u32> {
    let xs = axis(params.x_range, params.width);
    let ys = axis(params.y_range, params.height);
    let chunk_rows = pool.config().chunk_rows.max(1);
    let mut counts = vec![0u32; params.width * params.height];

    pool.for_each_chunk(&mut counts, params.width * chunk_rows, |k, chunk| {
        fill_rows(params, &xs, &ys, k * chunk_rows, chunk);
    });
    counts
}
