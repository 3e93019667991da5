//! Finite-difference residual of the implicit Fisher step.

use super::{Boundary, Discretization};
use crate::error::{KernelError, KernelResult};
use crate::kernels::Variant;
use crate::parallel::WorkPool;

/// Reaction coefficient of the Fisher equation
pub const REACTION_RATE: f64 = 1000.0;

/// Evaluate the residual of one implicit Euler step into `out`:
///
/// `F(u) = -(4 + alpha) u + (west + east + south + north) + alpha u_old + beta u (1 - u)`
///
/// with `beta = REACTION_RATE * dx^2`. Neighbours outside the grid are read
/// from `boundary`. Every variant evaluates the same expression in the same
/// order, so results are bit-identical.
pub fn diffusion(
    u: &[f64],
    u_old: &[f64],
    boundary: &Boundary,
    disc: &Discretization,
    out: &mut [f64],
    variant: Variant,
    pool: Option<&WorkPool>,
) -> KernelResult<()> {
    let n = disc.n();
    if u.len() != n || u_old.len() != n || out.len() != n {
        return Err(KernelError::shape_mismatch(
            format!("fields of {} points", n),
            format!(
                "u: {}, u_old: {}, out: {}",
                u.len(),
                u_old.len(),
                out.len()
            ),
        ));
    }
    boundary.check(disc)?;

    match variant {
        Variant::Baseline => diffusion_baseline(u, u_old, boundary, disc, out),
        Variant::Vectorized | Variant::Compiled => {
            for (j, row) in out.chunks_mut(disc.nx).enumerate() {
                diffusion_row(u, u_old, boundary, disc, j, row);
            }
        }
        Variant::Parallel => {
            let pool = pool.ok_or_else(|| {
                KernelError::invalid_input("parallel variant requires a work pool")
            })?;
            let chunk_rows = pool.config().chunk_rows.max(1);
            pool.for_each_chunk(out, disc.nx * chunk_rows, |k, chunk| {
                for (offset, row) in chunk.chunks_mut(disc.nx).enumerate() {
                    diffusion_row(u, u_old, boundary, disc, k * chunk_rows + offset, row);
                }
            });
        }
    }
    Ok(())
}

#[inline(always)]
#[allow(clippy::too_many_arguments)]
fn stencil_point(
    center: f64,
    west: f64,
    east: f64,
    south: f64,
    north: f64,
    old: f64,
    alpha: f64,
    beta: f64,
) -> f64 {
    -(4.0 + alpha) * center + west + east + south + north
        + alpha * old
        + beta * center * (1.0 - center)
}

fn diffusion_baseline(
    u: &[f64],
    u_old: &[f64],
    boundary: &Boundary,
    disc: &Discretization,
    out: &mut [f64],
) {
    let (nx, ny) = (disc.nx as isize, disc.ny as isize);
    let beta = REACTION_RATE * disc.dx * disc.dx;

    let value = |i: isize, j: isize| -> f64 {
        if i < 0 {
            boundary.west[j as usize]
        } else if i >= nx {
            boundary.east[j as usize]
        } else if j < 0 {
            boundary.south[i as usize]
        } else if j >= ny {
            boundary.north[i as usize]
        } else {
            u[(i + j * nx) as usize]
        }
    };

    for j in 0..ny {
        for i in 0..nx {
            let idx = (i + j * nx) as usize;
            out[idx] = stencil_point(
                value(i, j),
                value(i - 1, j),
                value(i + 1, j),
                value(i, j - 1),
                value(i, j + 1),
                u_old[idx],
                disc.alpha,
                beta,
            );
        }
    }
}

fn diffusion_row(
    u: &[f64],
    u_old: &[f64],
    boundary: &Boundary,
    disc: &Discretization,
    j: usize,
    out: &mut [f64],
) {
    let (nx, ny) = (disc.nx, disc.ny);
    let beta = REACTION_RATE * disc.dx * disc.dx;
    let base = j * nx;
    let row = &u[base..base + nx];
    let old = &u_old[base..base + nx];

    for (i, slot) in out.iter_mut().enumerate() {
        let west = if i > 0 { row[i - 1] } else { boundary.west[j] };
        let east = if i + 1 < nx { row[i + 1] } else { boundary.east[j] };
        let south = if j > 0 { u[base - nx + i] } else { boundary.south[i] };
        let north = if j + 1 < ny { u[base + nx + i] } else { boundary.north[i] };
        *slot = stencil_point(row[i], west, east, south, north, old[i], disc.alpha, beta);
    }
}
