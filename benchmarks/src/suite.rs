//! Suite runner: times every variant of every kernel and checks each one
//! against the baseline output.

use crate::{
    max_abs_diff, max_rel_diff, measure, KernelReport, PlatformInfo, SuiteReport, VariantTiming,
};
use chrono::Utc;
use kernbench_core::stencil::{initial_condition, timeloop, Boundary};
use kernbench_core::{
    distance_matrix, estimate_pi, julia_set, BenchConfig, KernelError, KernelResult, Metric,
    RangeBuffer, RectangleSet, Variant, WorkPool,
};
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kernel selection for a suite run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    Pi,
    Julia,
    Distance,
    Shapes,
    Stencil,
    All,
}

impl KernelKind {
    pub fn includes(&self, other: KernelKind) -> bool {
        *self == KernelKind::All || *self == other
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelKind::Pi => "pi",
            KernelKind::Julia => "julia",
            KernelKind::Distance => "distance",
            KernelKind::Shapes => "shapes",
            KernelKind::Stencil => "stencil",
            KernelKind::All => "all",
        };
        f.write_str(name)
    }
}

impl FromStr for KernelKind {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pi" | "montecarlo" => Ok(KernelKind::Pi),
            "julia" => Ok(KernelKind::Julia),
            "distance" => Ok(KernelKind::Distance),
            "shapes" => Ok(KernelKind::Shapes),
            "stencil" | "fisher" => Ok(KernelKind::Stencil),
            "all" => Ok(KernelKind::All),
            other => Err(KernelError::ParseError(format!(
                "unknown kernel '{}'",
                other
            ))),
        }
    }
}

/// Random `rows x cols` matrix with entries in `[0, scale)`
pub fn random_matrix(rows: usize, cols: usize, scale: f64, rng: &mut ChaCha8Rng) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| rng.gen::<f64>() * scale)
}

fn timing(
    variant: Variant,
    durations: Vec<std::time::Duration>,
    max_error: f64,
    tol: f64,
) -> VariantTiming {
    VariantTiming {
        variant,
        durations,
        max_error,
        equivalent: max_error <= tol,
    }
}

pub fn run_pi(config: &BenchConfig, pool: &WorkPool) -> KernelResult<KernelReport> {
    let samples = config.pi.samples;
    let mut report = KernelReport::new("pi", format!("{} samples", samples));
    let mut reference = None;

    for variant in Variant::ALL {
        let (estimate, durations) = measure(config.warmup, config.repeats, || {
            estimate_pi(samples, config.seed, variant, Some(pool))
        })?;
        let expected = *reference.get_or_insert(estimate);
        let error = (estimate - expected).abs();
        // The parallel variant draws from per-chunk streams, so it is only
        // statistically equal to the serial estimate.
        let tolerance = if variant.is_parallel() {
            config.pi.tolerance
        } else {
            0.0
        };
        tracing::debug!(%variant, estimate, error, "pi estimate");
        report
            .variants
            .push(timing(variant, durations, error, tolerance));
    }
    Ok(report)
}

pub fn run_julia(config: &BenchConfig, pool: &WorkPool) -> KernelResult<KernelReport> {
    let params = &config.julia;
    let mut report = KernelReport::new(
        "julia",
        format!("{}x{}, {} iterations", params.width, params.height, params.max_iter),
    );
    let mut reference: Option<DMatrix<u32>> = None;

    for variant in Variant::ALL {
        let (grid, durations) = measure(config.warmup, config.repeats, || {
            julia_set(params, variant, Some(pool))
        })?;
        let mismatches = match &reference {
            Some(expected) => expected
                .iter()
                .zip(grid.iter())
                .filter(|(a, b)| a != b)
                .count(),
            None => 0,
        };
        tracing::debug!(%variant, mismatches, "julia grid");
        if reference.is_none() {
            reference = Some(grid);
        }
        report
            .variants
            .push(timing(variant, durations, mismatches as f64, 0.0));
    }
    Ok(report)
}

/// One report per metric
pub fn run_distance(config: &BenchConfig, pool: &WorkPool) -> KernelResult<Vec<KernelReport>> {
    let cfg = &config.distance;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let x = random_matrix(cfg.samples, cfg.features, cfg.scale, &mut rng);
    let y = random_matrix(cfg.samples, cfg.features, cfg.scale, &mut rng);

    let mut reports = Vec::with_capacity(Metric::ALL.len());
    for metric in Metric::ALL {
        let mut report = KernelReport::new(
            format!("distance/{}", metric),
            format!("{}x{} features", cfg.samples, cfg.features),
        );
        let mut reference: Option<DMatrix<f64>> = None;

        for variant in Variant::ALL {
            let (out, durations) = measure(config.warmup, config.repeats, || {
                distance_matrix(&x, &y, metric, variant, Some(pool))
            })?;
            let error = match &reference {
                Some(expected) => max_rel_diff(expected.as_slice(), out.as_slice()),
                None => 0.0,
            };
            tracing::debug!(%metric, %variant, error, "distance matrix");
            if reference.is_none() {
                reference = Some(out);
            }
            report
                .variants
                .push(timing(variant, durations, error, cfg.tolerance));
        }
        reports.push(report);
    }
    Ok(reports)
}

/// Rectangle aggregate and range buffer reductions.
///
/// Only the variants that have a distinct implementation are timed: the
/// rectangle sum runs serially and on the pool, the range buffer sum runs
/// through checked `at()` reads and over the raw slice.
pub fn run_shapes(config: &BenchConfig, pool: &WorkPool) -> KernelResult<Vec<KernelReport>> {
    let cfg = &config.shapes;
    let rects = RectangleSet::random(cfg.rectangles, config.seed);

    let mut area = KernelReport::new("shapes/rectangles", format!("{} rectangles", rects.len()));
    let (serial, durations) = measure(config.warmup, config.repeats, || Ok(rects.total_area()))?;
    area.variants
        .push(timing(Variant::Compiled, durations, 0.0, 0.0));
    let (parallel, durations) = measure(config.warmup, config.repeats, || {
        Ok(rects.total_area_parallel(pool))
    })?;
    let error = max_rel_diff(&[serial], &[parallel]);
    area.variants
        .push(timing(Variant::Parallel, durations, error, 1e-9));

    let buffer = RangeBuffer::new(cfg.range_start, cfg.range_stop)?;
    let mut range = KernelReport::new("shapes/range", format!("{} values", buffer.len()));
    let (checked, durations) = measure(config.warmup, config.repeats, || {
        let mut total: i128 = 0;
        for index in 0..buffer.len() {
            total += i128::from(buffer.at(index)?);
        }
        Ok(total)
    })?;
    range
        .variants
        .push(timing(Variant::Baseline, durations, 0.0, 0.0));
    let (slice_sum, durations) = measure(config.warmup, config.repeats, || Ok(buffer.sum()))?;
    let error = (checked - slice_sum).unsigned_abs() as f64;
    range
        .variants
        .push(timing(Variant::Compiled, durations, error, 0.0));

    Ok(vec![area, range])
}

pub fn run_stencil(config: &BenchConfig, pool: &WorkPool) -> KernelResult<KernelReport> {
    let cfg = &config.stencil;
    let disc = cfg.discretization()?;
    let boundary = Boundary::dirichlet_zero(&disc);
    let mut report = KernelReport::new(
        "stencil",
        format!("{}x{}, {} steps", disc.nx, disc.ny, disc.nt),
    );
    let mut reference: Option<Vec<f64>> = None;

    // Vectorized and compiled share the row-wise serial loop
    for variant in [Variant::Baseline, Variant::Compiled, Variant::Parallel] {
        let (field, durations) = measure(config.warmup, config.repeats, || {
            let mut u = initial_condition(&disc);
            let status = timeloop(&mut u, &boundary, &disc, &cfg.solver, variant, Some(pool))?;
            if !status.converged {
                return Err(KernelError::Other(format!(
                    "{} solver stopped at time step {}",
                    variant, status.timestep
                )));
            }
            Ok(u)
        })?;
        let error = match &reference {
            Some(expected) => max_abs_diff(expected, &field),
            None => 0.0,
        };
        tracing::debug!(%variant, error, "stencil field");
        if reference.is_none() {
            reference = Some(field);
        }
        report.variants.push(timing(variant, durations, error, 0.0));
    }
    Ok(report)
}

/// Run the selected kernels with one shared pool
pub fn run_suite(config: &BenchConfig, kind: KernelKind) -> KernelResult<SuiteReport> {
    config.validate()?;
    let pool = WorkPool::new(&config.parallel)?;
    tracing::info!(threads = pool.threads(), kernel = %kind, "starting suite");

    let mut kernels = Vec::new();
    if kind.includes(KernelKind::Pi) {
        kernels.push(run_pi(config, &pool)?);
    }
    if kind.includes(KernelKind::Julia) {
        kernels.push(run_julia(config, &pool)?);
    }
    if kind.includes(KernelKind::Distance) {
        kernels.extend(run_distance(config, &pool)?);
    }
    if kind.includes(KernelKind::Shapes) {
        kernels.extend(run_shapes(config, &pool)?);
    }
    if kind.includes(KernelKind::Stencil) {
        kernels.push(run_stencil(config, &pool)?);
    }

    for report in &kernels {
        if !report.all_equivalent() {
            tracing::warn!(kernel = %report.kernel, "variant outputs differ from the baseline");
        }
    }

    Ok(SuiteReport {
        timestamp: Utc::now().to_rfc3339(),
        platform: PlatformInfo::detect(),
        threads: pool.threads(),
        config: config.clone(),
        kernels,
    })
}
