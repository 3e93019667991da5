//! kernbench Benchmark Suite Library
//!
//! Timing utilities for comparing kernel variants against their baseline.
//! Provides repeated measurement, statistical analysis, equivalence checks
//! and JSON reports.

// Benchmarks - allow common warnings for measurement code
#![allow(clippy::too_many_arguments)]

pub mod suite;

use kernbench_core::{BenchConfig, KernelError, KernelResult, Variant};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// Timings and equivalence outcome of one kernel variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantTiming {
    pub variant: Variant,
    pub durations: Vec<Duration>,
    /// Largest deviation from the reference output
    pub max_error: f64,
    /// Whether `max_error` is within the kernel's tolerance
    pub equivalent: bool,
}

impl VariantTiming {
    /// Calculate statistical metrics
    pub fn statistics(&self) -> Statistics {
        Statistics::from_durations(&self.durations)
    }
}

/// Statistical metrics for a set of timed runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub mean: Duration,
    pub median: Duration,
    pub p95: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Standard deviation in nanoseconds
    pub std_dev: f64,
}

impl Statistics {
    pub fn from_durations(durations: &[Duration]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }
        let mut values_ns: Vec<f64> = durations.iter().map(|d| d.as_nanos() as f64).collect();
        values_ns.sort_by(|a, b| a.total_cmp(b));

        let len = values_ns.len();
        let mean = values_ns.iter().sum::<f64>() / len as f64;

        // Calculate median correctly for even-length arrays
        let median_value = if len % 2 == 0 {
            (values_ns[len / 2 - 1] + values_ns[len / 2]) / 2.0
        } else {
            values_ns[len / 2]
        };

        Statistics {
            mean: Duration::from_nanos(mean as u64),
            median: Duration::from_nanos(median_value as u64),
            p95: Duration::from_nanos(calculate_percentile(&values_ns, 95.0) as u64),
            min: Duration::from_nanos(values_ns[0] as u64),
            max: Duration::from_nanos(values_ns[len - 1] as u64),
            std_dev: calculate_std_dev(&values_ns, mean),
        }
    }

    /// Format statistics as a pretty table
    pub fn format_table(&self) -> String {
        format!(
            r#"
─────────────────────────────────────
 Statistical Analysis
─────────────────────────────────────
 Mean:   {:>12.3} ms
 Median: {:>12.3} ms
 P95:    {:>12.3} ms
 Min:    {:>12.3} ms
 Max:    {:>12.3} ms
 StdDev: {:>12.3} ms
─────────────────────────────────────"#,
            self.mean.as_secs_f64() * 1_000.0,
            self.median.as_secs_f64() * 1_000.0,
            self.p95.as_secs_f64() * 1_000.0,
            self.min.as_secs_f64() * 1_000.0,
            self.max.as_secs_f64() * 1_000.0,
            self.std_dev / 1_000_000.0,
        )
    }
}

/// Calculate standard deviation using unbiased sample variance (n-1 denominator)
fn calculate_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Calculate percentile using linear interpolation (NIST R-7 method)
fn calculate_percentile(values: &[f64], percentile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    // NIST R-7 method: h = (n-1) * p/100
    let h = (n - 1) as f64 * (percentile / 100.0);
    let h_floor = h.floor() as usize;
    let h_ceil = h.ceil() as usize;

    if h_floor >= n - 1 {
        return values[n - 1];
    }

    let lower = values[h_floor];
    let upper = values[h_ceil];
    let weight = h - h_floor as f64;

    lower + weight * (upper - lower)
}

/// All variants of one kernel at one problem size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelReport {
    pub kernel: String,
    /// Human-readable problem size
    pub size: String,
    /// First entry is the reference the others are compared to
    pub variants: Vec<VariantTiming>,
}

impl KernelReport {
    pub fn new(kernel: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            kernel: kernel.into(),
            size: size.into(),
            variants: Vec::new(),
        }
    }

    pub fn reference(&self) -> Option<&VariantTiming> {
        self.variants.first()
    }

    /// Reference median time divided by this variant's median time
    pub fn speedup(&self, variant: Variant) -> Option<f64> {
        let reference = self.reference()?.statistics().median.as_secs_f64();
        let timing = self.variants.iter().find(|v| v.variant == variant)?;
        let median = timing.statistics().median.as_secs_f64();
        if median > 0.0 {
            Some(reference / median)
        } else {
            None
        }
    }

    pub fn all_equivalent(&self) -> bool {
        self.variants.iter().all(|v| v.equivalent)
    }
}

/// Machine description stored alongside results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
    pub logical_cores: usize,
    pub physical_cores: usize,
}

impl PlatformInfo {
    pub fn detect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            logical_cores: num_cpus::get(),
            physical_cores: num_cpus::get_physical(),
        }
    }
}

/// Complete suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub timestamp: String,
    pub platform: PlatformInfo,
    pub threads: usize,
    pub config: BenchConfig,
    pub kernels: Vec<KernelReport>,
}

impl SuiteReport {
    pub fn all_equivalent(&self) -> bool {
        self.kernels.iter().all(KernelReport::all_equivalent)
    }

    pub fn write_json(&self, path: &Path) -> KernelResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Warmup iterations to stabilize cache and branch prediction
pub fn warmup<F>(iterations: usize, mut f: F)
where
    F: FnMut(),
{
    for _ in 0..iterations {
        f();
        std::hint::black_box(());
    }
}

/// Run `f` `warmup` times untimed, then `repeats` times timed.
///
/// Returns the output of the last timed run with all durations.
pub fn measure<T, F>(warmup: usize, repeats: usize, mut f: F) -> KernelResult<(T, Vec<Duration>)>
where
    F: FnMut() -> KernelResult<T>,
{
    for _ in 0..warmup {
        std::hint::black_box(f()?);
    }

    let mut durations = Vec::with_capacity(repeats);
    let mut last = None;
    for _ in 0..repeats {
        let start = Instant::now();
        let out = std::hint::black_box(f()?);
        durations.push(start.elapsed());
        last = Some(out);
    }

    last.map(|out| (out, durations))
        .ok_or_else(|| KernelError::config("repeats must be positive"))
}

/// Largest absolute element-wise difference
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Largest element-wise difference relative to the larger magnitude
pub fn max_rel_diff(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let scale = x.abs().max(y.abs());
            if scale == 0.0 {
                0.0
            } else {
                (x - y).abs() / scale
            }
        })
        .fold(0.0, f64::max)
}
