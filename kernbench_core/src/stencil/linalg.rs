//! Level-1 vector operations and the matrix-free conjugate gradient solver.

use super::Stepper;
use crate::error::KernelResult;
use serde::{Deserialize, Serialize};

/// Relative step used for finite-difference Jacobian products
pub const JACOBIAN_EPS: f64 = 1.0e-8;

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn norm_sq(a: &[f64]) -> f64 {
    a.iter().map(|x| x * x).sum()
}

pub fn norm2(a: &[f64]) -> f64 {
    norm_sq(a).sqrt()
}

/// `y += alpha * x`
pub fn axpy(y: &mut [f64], alpha: f64, x: &[f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// `out = alpha * x + beta * y`
pub fn lcomb(out: &mut [f64], alpha: f64, x: &[f64], beta: f64, y: &[f64]) {
    for ((o, xi), yi) in out.iter_mut().zip(x).zip(y) {
        *o = alpha * xi + beta * yi;
    }
}

pub fn copy_into(dst: &mut [f64], src: &[f64]) {
    dst.copy_from_slice(src);
}

/// Outcome of one CG solve
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CgStatus {
    pub iters: usize,
    pub residual: f64,
    pub converged: bool,
}

/// Scratch vectors reused across CG solves
#[derive(Debug, Clone)]
pub struct CgWorkspace {
    r: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
    shifted: Vec<f64>,
    f_u: Vec<f64>,
    f_shifted: Vec<f64>,
}

impl CgWorkspace {
    pub fn new(n: usize) -> Self {
        Self {
            r: vec![0.0; n],
            p: vec![0.0; n],
            ap: vec![0.0; n],
            shifted: vec![0.0; n],
            f_u: vec![0.0; n],
            f_shifted: vec![0.0; n],
        }
    }
}

/// `out = (F(u + h v) - F(u)) / h`, with `F(u)` precomputed in `f_u`.
///
/// The step `h = eps (1 + |u|) / |v|` keeps the perturbation well above the
/// rounding level of `u` whatever the scale of `v`.
#[allow(clippy::too_many_arguments)]
fn jacobian_product(
    stepper: &Stepper<'_>,
    u: &[f64],
    u_old: &[f64],
    v: &[f64],
    shifted: &mut [f64],
    f_shifted: &mut [f64],
    f_u: &[f64],
    out: &mut [f64],
) -> KernelResult<()> {
    let v_norm = norm2(v);
    if v_norm == 0.0 {
        out.fill(0.0);
        return Ok(());
    }
    let h = JACOBIAN_EPS * (1.0 + norm2(u)) / v_norm;

    lcomb(shifted, 1.0, u, h, v);
    stepper.residual(shifted, u_old, f_shifted)?;
    let inv = 1.0 / h;
    lcomb(out, inv, f_shifted, -inv, f_u);
    Ok(())
}

/// Solve `J(u) x = b` by conjugate gradients, where `J` is the Jacobian of
/// the residual at `u`, applied through finite differences.
///
/// `x` holds the initial guess on entry and the solution on return.
#[allow(clippy::too_many_arguments)]
pub fn cg(
    stepper: &Stepper<'_>,
    x: &mut [f64],
    u: &[f64],
    u_old: &[f64],
    b: &[f64],
    tolerance: f64,
    max_iters: usize,
    ws: &mut CgWorkspace,
) -> KernelResult<CgStatus> {
    let CgWorkspace {
        r,
        p,
        ap,
        shifted,
        f_u,
        f_shifted,
    } = ws;

    stepper.residual(u, u_old, f_u)?;

    // r = b - J x
    jacobian_product(stepper, u, u_old, x, shifted, f_shifted, f_u, ap)?;
    lcomb(r, 1.0, b, -1.0, ap);
    copy_into(p, r);

    let mut rold = norm_sq(r);
    if rold.sqrt() < tolerance {
        return Ok(CgStatus {
            iters: 0,
            residual: rold.sqrt(),
            converged: true,
        });
    }

    for k in 0..max_iters {
        jacobian_product(stepper, u, u_old, p, shifted, f_shifted, f_u, ap)?;

        let p_ap = dot(p, ap);
        if p_ap == 0.0 || !p_ap.is_finite() {
            log::debug!("cg breakdown after {} iterations (p'Ap = {})", k, p_ap);
            return Ok(CgStatus {
                iters: k,
                residual: rold.sqrt(),
                converged: false,
            });
        }
        let alpha = rold / p_ap;
        axpy(x, alpha, p);
        axpy(r, -alpha, ap);

        let rnew = norm_sq(r);
        if rnew.sqrt() < tolerance {
            return Ok(CgStatus {
                iters: k + 1,
                residual: rnew.sqrt(),
                converged: true,
            });
        }

        // p = r + (rnew / rold) p
        let beta = rnew / rold;
        for (pi, ri) in p.iter_mut().zip(r.iter()) {
            *pi = ri + beta * *pi;
        }
        rold = rnew;
    }

    Ok(CgStatus {
        iters: max_iters,
        residual: rold.sqrt(),
        converged: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Variant;
    use crate::stencil::{Boundary, Discretization};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_blas1() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, -5.0, 6.0];
        assert_eq!(dot(&a, &b), 12.0);
        assert_eq!(norm2(&[3.0, 4.0]), 5.0);

        let mut y = [1.0, 1.0, 1.0];
        axpy(&mut y, 2.0, &a);
        assert_eq!(y, [3.0, 5.0, 7.0]);

        let mut out = [0.0; 3];
        lcomb(&mut out, 1.0, &a, -1.0, &b);
        assert_eq!(out, [-3.0, 7.0, -3.0]);

        let mut dst = [0.0; 3];
        copy_into(&mut dst, &a);
        assert_abs_diff_eq!(dst[2], 3.0);
    }

    #[test]
    fn test_cg_two_point_problem() {
        // 2x1 grid, dx = 1, dt = 0.1: alpha = 10, beta = 1000. At u = 0 the
        // Jacobian is [[986, 1], [1, 986]] and every point sees three
        // boundary neighbours, so b = 3g and the solution is 3g / 987.
        let disc = Discretization::new(2, 1, 1, 0.1).unwrap();
        let boundary = Boundary::constant(&disc, 1.0);
        let stepper = Stepper {
            boundary: &boundary,
            disc: &disc,
            variant: Variant::Compiled,
            pool: None,
        };
        let u = vec![0.0; 2];
        let mut b = vec![0.0; 2];
        stepper.residual(&u, &u, &mut b).unwrap();
        assert_eq!(b, vec![3.0, 3.0]);

        let mut x = vec![0.0; 2];
        let mut ws = CgWorkspace::new(2);
        let status = cg(&stepper, &mut x, &u, &u, &b, 1e-6, 10, &mut ws).unwrap();

        assert!(status.converged);
        assert!(status.iters <= 2);
        assert!(status.residual < 1e-6);
        for xi in &x {
            assert_abs_diff_eq!(*xi, 3.0 / 987.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_cg_zero_rhs_returns_immediately() {
        let disc = Discretization::new(4, 4, 1, 0.01).unwrap();
        let boundary = Boundary::dirichlet_zero(&disc);
        let stepper = Stepper {
            boundary: &boundary,
            disc: &disc,
            variant: Variant::Baseline,
            pool: None,
        };
        let u = vec![0.0; disc.n()];
        let b = vec![0.0; disc.n()];
        let mut x = vec![0.0; disc.n()];
        let mut ws = CgWorkspace::new(disc.n());

        let status = cg(&stepper, &mut x, &u, &u, &b, 1e-6, 10, &mut ws).unwrap();
        assert_eq!(status.iters, 0);
        assert!(status.converged);
        assert!(x.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_cg_reports_iteration_limit() {
        let disc = Discretization::new(8, 8, 1, 0.001).unwrap();
        let boundary = Boundary::constant(&disc, 1.0);
        let stepper = Stepper {
            boundary: &boundary,
            disc: &disc,
            variant: Variant::Compiled,
            pool: None,
        };
        let u = vec![0.0; disc.n()];
        let mut b = vec![0.0; disc.n()];
        stepper.residual(&u, &u, &mut b).unwrap();

        let mut x = vec![0.0; disc.n()];
        let mut ws = CgWorkspace::new(disc.n());
        let status = cg(&stepper, &mut x, &u, &u, &b, 1e-12, 1, &mut ws).unwrap();
        assert!(!status.converged);
        assert_eq!(status.iters, 1);
        assert!(status.residual > 1e-12);
    }
}
