//! Mini-stencil: the 2-D Fisher equation
//!
//! Solves `u_t = D lap(u) + R u (1 - u)` on the unit-width domain with
//! second-order finite differences, implicit Euler time stepping, Newton
//! iterations for the nonlinear system and a matrix-free conjugate gradient
//! solver for each Newton update.
//!
//! The field is stored row by row: point `(i, j)` lives at `i + j * nx`,
//! with `i` along x and `j` along y.

pub mod linalg;
pub mod operators;

pub use linalg::{CgStatus, CgWorkspace};
pub use operators::diffusion;

use crate::error::{KernelError, KernelResult};
use crate::kernels::Variant;
use crate::parallel::WorkPool;
use serde::{Deserialize, Serialize};

/// Grid and time-step parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discretization {
    pub nx: usize,
    pub ny: usize,
    /// Number of time steps
    pub nt: usize,
    pub dt: f64,
    /// Grid spacing in both directions
    pub dx: f64,
    /// `dx^2 / dt`
    pub alpha: f64,
}

impl Discretization {
    /// Discretize `nt` steps up to time `t_end` on an `nx x ny` grid whose
    /// x extent is 1.
    pub fn new(nx: usize, ny: usize, nt: usize, t_end: f64) -> KernelResult<Self> {
        if nx < 2 || ny == 0 {
            return Err(KernelError::invalid_input(format!(
                "grid must be at least 2x1, got {}x{}",
                nx, ny
            )));
        }
        if nt == 0 {
            return Err(KernelError::invalid_input(
                "number of time steps must be positive",
            ));
        }
        if !(t_end.is_finite() && t_end > 0.0) {
            return Err(KernelError::invalid_input(format!(
                "simulated time must be positive, got {}",
                t_end
            )));
        }

        let dt = t_end / nt as f64;
        let dx = 1.0 / (nx - 1) as f64;
        Ok(Self {
            nx,
            ny,
            nt,
            dt,
            dx,
            alpha: dx * dx / dt,
        })
    }

    /// Number of grid points
    pub fn n(&self) -> usize {
        self.nx * self.ny
    }
}

/// Dirichlet values just outside each edge of the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Above the last row, one value per column
    pub north: Vec<f64>,
    /// Below the first row, one value per column
    pub south: Vec<f64>,
    /// Right of the last column, one value per row
    pub east: Vec<f64>,
    /// Left of the first column, one value per row
    pub west: Vec<f64>,
}

impl Boundary {
    pub fn dirichlet_zero(disc: &Discretization) -> Self {
        Self::constant(disc, 0.0)
    }

    pub fn constant(disc: &Discretization, value: f64) -> Self {
        Self {
            north: vec![value; disc.nx],
            south: vec![value; disc.nx],
            east: vec![value; disc.ny],
            west: vec![value; disc.ny],
        }
    }

    pub fn check(&self, disc: &Discretization) -> KernelResult<()> {
        if self.north.len() != disc.nx
            || self.south.len() != disc.nx
            || self.east.len() != disc.ny
            || self.west.len() != disc.ny
        {
            return Err(KernelError::shape_mismatch(
                format!("north/south of {} and east/west of {}", disc.nx, disc.ny),
                format!(
                    "north {}, south {}, east {}, west {}",
                    self.north.len(),
                    self.south.len(),
                    self.east.len(),
                    self.west.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Newton and CG iteration limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub max_cg_iters: usize,
    pub max_newton_iters: usize,
    pub tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_cg_iters: 200,
            max_newton_iters: 50,
            tolerance: 1.0e-6,
        }
    }
}

/// Outcome of a full time loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonStatus {
    pub converged: bool,
    /// Last time step attempted (1-based)
    pub timestep: usize,
    pub iters_newton: usize,
    pub iters_cg: usize,
    /// Status of the most recent CG solve
    pub last_cg: CgStatus,
}

/// Residual evaluator bound to one grid, boundary and execution variant
#[derive(Debug, Clone, Copy)]
pub struct Stepper<'a> {
    pub boundary: &'a Boundary,
    pub disc: &'a Discretization,
    pub variant: Variant,
    pub pool: Option<&'a WorkPool>,
}

impl<'a> Stepper<'a> {
    pub fn residual(&self, u: &[f64], u_old: &[f64], out: &mut [f64]) -> KernelResult<()> {
        diffusion(
            u,
            u_old,
            self.boundary,
            self.disc,
            out,
            self.variant,
            self.pool,
        )
    }
}

/// Initial concentration: 0.1 inside a circle centred at `(1/4, ydim/4)`,
/// with radius no larger than an eighth of either extent; zero elsewhere.
///
/// Grid points sit at `x = i / (nx - 1)` and `y = j / (ny - 1)`, so both
/// axes span `[0, 1]` whatever the grid shape.
pub fn initial_condition(disc: &Discretization) -> Vec<f64> {
    let xc: f64 = 0.25;
    let yc = (disc.ny - 1) as f64 * disc.dx / 4.0;
    let radius = f64::min(xc, yc) / 2.0;

    let mut u = vec![0.0; disc.n()];
    for j in 0..disc.ny {
        let y = unit_coordinate(j, disc.ny);
        for i in 0..disc.nx {
            let x = unit_coordinate(i, disc.nx);
            if (x - xc).powi(2) + (y - yc).powi(2) < radius * radius {
                u[i + j * disc.nx] = 0.1;
            }
        }
    }
    u
}

/// Position of grid index `k` on `[0, 1]` sampled at `n` points
fn unit_coordinate(k: usize, n: usize) -> f64 {
    if n > 1 {
        k as f64 / (n - 1) as f64
    } else {
        0.0
    }
}

/// Advance `u` through all time steps.
///
/// Each step runs Newton iterations: evaluate the residual `b = F(u)`, stop
/// once `|b| < tolerance`, otherwise solve `J delta = b` with CG and update
/// `u -= delta`. The loop stops at the first step that fails to converge.
pub fn timeloop(
    u: &mut [f64],
    boundary: &Boundary,
    disc: &Discretization,
    options: &SolverOptions,
    variant: Variant,
    pool: Option<&WorkPool>,
) -> KernelResult<NewtonStatus> {
    let n = disc.n();
    if u.len() != n {
        return Err(KernelError::shape_mismatch(
            format!("{} points", n),
            format!("{} points", u.len()),
        ));
    }
    boundary.check(disc)?;

    let stepper = Stepper {
        boundary,
        disc,
        variant,
        pool,
    };
    let mut b = vec![0.0; n];
    let mut delta = vec![0.0; n];
    let mut u_old = vec![0.0; n];
    let mut ws = CgWorkspace::new(n);

    let mut status = NewtonStatus {
        converged: false,
        timestep: 0,
        iters_newton: 0,
        iters_cg: 0,
        last_cg: CgStatus::default(),
    };

    for step in 1..=disc.nt {
        status.timestep = step;
        status.converged = false;
        linalg::copy_into(&mut u_old, u);

        for _ in 0..options.max_newton_iters {
            stepper.residual(u, &u_old, &mut b)?;
            status.iters_newton += 1;

            let residual = linalg::norm2(&b);
            if residual < options.tolerance {
                status.converged = true;
                break;
            }

            delta.fill(0.0);
            let cg = linalg::cg(
                &stepper,
                &mut delta,
                u,
                &u_old,
                &b,
                options.tolerance,
                options.max_cg_iters,
                &mut ws,
            )?;
            status.iters_cg += cg.iters;
            status.last_cg = cg;
            if !cg.converged {
                log::warn!(
                    "CG failed to converge after {} iterations, with residual {:e}",
                    cg.iters,
                    cg.residual
                );
                break;
            }

            linalg::axpy(u, -1.0, &delta);
        }

        if !status.converged {
            log::warn!("step {}: nonlinear iterations failed to converge", step);
            break;
        }
        log::trace!(
            "step {} converged ({} newton, {} cg iterations so far)",
            step,
            status.iters_newton,
            status.iters_cg
        );
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discretization() {
        let disc = Discretization::new(11, 6, 20, 0.02).unwrap();
        assert_eq!(disc.n(), 66);
        assert!((disc.dt - 0.001).abs() < 1e-15);
        assert!((disc.dx - 0.1).abs() < 1e-15);
        assert!((disc.alpha - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_discretization_rejects_bad_input() {
        assert!(Discretization::new(1, 4, 1, 1.0).is_err());
        assert!(Discretization::new(4, 0, 1, 1.0).is_err());
        assert!(Discretization::new(4, 4, 0, 1.0).is_err());
        assert!(Discretization::new(4, 4, 1, -1.0).is_err());
        assert!(Discretization::new(4, 4, 1, f64::NAN).is_err());
    }

    #[test]
    fn test_initial_condition_circle() {
        let disc = Discretization::new(33, 33, 1, 0.01).unwrap();
        let u = initial_condition(&disc);
        let filled = u.iter().filter(|&&v| v == 0.1).count();
        assert!(filled > 0);
        assert!(u.iter().all(|&v| v == 0.0 || v == 0.1));
        // centre (0.25, 0.25) -> (8, 8) on a 1/32 grid
        assert_eq!(u[8 + 8 * 33], 0.1);
        assert_eq!(u[0], 0.0);
    }

    #[test]
    fn test_initial_condition_non_square_grid() {
        // x on a 1/32 grid, y on a 1/16 grid: yc = 16 / 32 / 4 = 0.125,
        // radius = 0.0625, so only points within 0.0625 of (0.25, 0.125)
        let disc = Discretization::new(33, 17, 1, 0.01).unwrap();
        let u = initial_condition(&disc);

        let filled: Vec<(usize, usize)> = (0..disc.ny)
            .flat_map(|j| (0..disc.nx).map(move |i| (i, j)))
            .filter(|&(i, j)| u[i + j * disc.nx] == 0.1)
            .collect();
        assert_eq!(filled, vec![(7, 2), (8, 2), (9, 2)]);
    }

    #[test]
    fn test_initial_condition_single_row() {
        let disc = Discretization::new(9, 1, 1, 0.01).unwrap();
        let u = initial_condition(&disc);
        // yc collapses to zero, so the circle is empty
        assert!(u.iter().all(|&v| v == 0.0));
    }

    fn fisher_problem() -> (Discretization, Boundary, Vec<f64>) {
        let disc = Discretization::new(16, 16, 5, 0.0025).unwrap();
        let boundary = Boundary::dirichlet_zero(&disc);
        let u = initial_condition(&disc);
        (disc, boundary, u)
    }

    #[test]
    fn test_timeloop_converges() {
        let (disc, boundary, mut u) = fisher_problem();
        let status = timeloop(
            &mut u,
            &boundary,
            &disc,
            &SolverOptions::default(),
            Variant::Compiled,
            None,
        )
        .unwrap();
        assert!(status.converged);
        assert_eq!(status.timestep, disc.nt);
        assert!(status.iters_newton >= disc.nt);
        assert!(status.last_cg.converged);
    }

    #[test]
    fn test_timeloop_stops_when_cg_fails() {
        let (disc, boundary, mut u) = fisher_problem();
        let options = SolverOptions {
            max_cg_iters: 1,
            ..SolverOptions::default()
        };
        let status = timeloop(&mut u, &boundary, &disc, &options, Variant::Compiled, None).unwrap();

        assert!(!status.converged);
        assert_eq!(status.timestep, 1);
        assert_eq!(status.iters_newton, 1);
        assert_eq!(status.iters_cg, 1);
        assert!(!status.last_cg.converged);
        // the failed update is never applied
        assert_eq!(u, initial_condition(&disc));
    }

    #[test]
    fn test_timeloop_stops_without_newton_iterations() {
        let (disc, boundary, mut u) = fisher_problem();
        let options = SolverOptions {
            max_newton_iters: 0,
            ..SolverOptions::default()
        };
        let status = timeloop(&mut u, &boundary, &disc, &options, Variant::Compiled, None).unwrap();

        assert!(!status.converged);
        assert_eq!(status.timestep, 1);
        assert_eq!(status.iters_newton, 0);
        assert_eq!(status.iters_cg, 0);
        assert_eq!(status.last_cg, CgStatus::default());
    }

    #[test]
    fn test_timeloop_rejects_wrong_field_length() {
        let (disc, boundary, _) = fisher_problem();
        let mut u = vec![0.0; disc.n() - 1];
        let err = timeloop(
            &mut u,
            &boundary,
            &disc,
            &SolverOptions::default(),
            Variant::Compiled,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_boundary_check() {
        let disc = Discretization::new(4, 3, 1, 0.1).unwrap();
        let mut boundary = Boundary::dirichlet_zero(&disc);
        assert!(boundary.check(&disc).is_ok());
        boundary.east.push(0.0);
        assert!(boundary.check(&disc).is_err());
    }
}
