//! Kernel Variant Benchmark
//!
//! Times the baseline, vectorized, compiled and parallel variants of every
//! kernel, checks each optimized output against the baseline and prints
//! median times with speedups.
//!
//! Usage:
//!   kernel_bench --preset quick
//!   kernel_bench --kernel distance --threads 4 --json results/distance.json
//!   kernel_bench --config bench.toml --profile

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use kernbench_benchmarks::suite::{random_matrix, run_suite, KernelKind};
use kernbench_benchmarks::{KernelReport, SuiteReport};
use kernbench_core::{euclidean_broadcast_profiled, BenchConfig, Profiler};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kernel_bench")]
#[command(about = "Compare naive and optimized numeric kernel variants")]
#[command(version)]
struct Cli {
    /// Configuration file (.toml, .yaml or .yml)
    #[arg(short, long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Problem size preset: quick, standard or full
    #[arg(short, long, default_value = "standard")]
    preset: String,

    /// Kernel to run
    #[arg(short, long, value_enum, default_value_t = KernelKind::All)]
    kernel: KernelKind,

    /// Worker threads for the parallel variants (default: logical CPUs)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Timed runs per variant
    #[arg(short, long)]
    repeats: Option<usize>,

    /// Write the full report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print a per-section profile of the broadcast Euclidean kernel
    #[arg(long)]
    profile: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    println!("{}", "======================================================================".cyan());
    println!("{}", "        kernbench Kernel Variant Benchmark                            ".cyan().bold());
    println!("{}", "======================================================================".cyan());
    println!(
        " Kernel: {}   Repeats: {}   Warmup: {}",
        cli.kernel, config.repeats, config.warmup
    );
    println!();

    let report = run_suite(&config, cli.kernel).context("benchmark suite failed")?;
    print_report(&report);

    if cli.profile {
        print_profile(&config)?;
    }

    if let Some(path) = &cli.json {
        report
            .write_json(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Report written to {}", path.display().to_string().green());
    }

    println!();
    if !report.all_equivalent() {
        bail!("one or more variants did not match the baseline output");
    }
    println!("{}", "[OK] All variants match the baseline".green().bold());
    Ok(())
}

fn load_config(cli: &Cli) -> Result<BenchConfig> {
    let mut config = match &cli.config {
        Some(path) => BenchConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BenchConfig::preset(&cli.preset)?,
    };

    if let Some(threads) = cli.threads {
        config.parallel.threads = Some(threads);
    }
    if let Some(repeats) = cli.repeats {
        config.repeats = repeats;
    }
    config.validate().context("invalid benchmark configuration")?;
    Ok(config)
}

fn print_report(report: &SuiteReport) {
    println!(
        " Platform: {} / {} ({} logical, {} physical cores), {} worker threads",
        report.platform.os,
        report.platform.arch,
        report.platform.logical_cores,
        report.platform.physical_cores,
        report.threads
    );
    println!();
    println!(
        "{:<20} {:<28} {:<11} {:>12} {:>10} {:>12}",
        "Kernel".bold(),
        "Size".bold(),
        "Variant".bold(),
        "Median (ms)".bold(),
        "Speedup".bold(),
        "Max error".bold()
    );
    println!("{}", "-".repeat(98));

    for kernel in &report.kernels {
        print_kernel(kernel);
    }
}

fn print_kernel(kernel: &KernelReport) {
    for (i, timing) in kernel.variants.iter().enumerate() {
        let (name, size) = if i == 0 {
            (kernel.kernel.as_str(), kernel.size.as_str())
        } else {
            ("", "")
        };
        let median_ms = timing.statistics().median.as_secs_f64() * 1_000.0;
        let speedup = kernel
            .speedup(timing.variant)
            .map(|s| format!("{:.2}x", s))
            .unwrap_or_else(|| "-".to_string());
        let speedup = if i == 0 {
            speedup.normal()
        } else if kernel.speedup(timing.variant).unwrap_or(0.0) >= 1.0 {
            speedup.green()
        } else {
            speedup.yellow()
        };
        let error = format!("{:.3e}", timing.max_error);
        let error = if timing.equivalent {
            error.normal()
        } else {
            error.red().bold()
        };

        println!(
            "{:<20} {:<28} {:<11} {:>12.3} {:>10} {:>12}",
            name,
            size,
            timing.variant.to_string(),
            median_ms,
            speedup,
            error
        );
    }
}

fn print_profile(config: &BenchConfig) -> Result<()> {
    let cfg = &config.distance;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let x = random_matrix(cfg.samples, cfg.features, cfg.scale, &mut rng);
    let y = random_matrix(cfg.samples, cfg.features, cfg.scale, &mut rng);

    let profiler = Profiler::new();
    for _ in 0..config.repeats {
        euclidean_broadcast_profiled(&x, &y, &profiler)?;
    }

    println!();
    println!(
        "{}",
        format!(
            "Broadcast Euclidean profile ({}x{} features, {} runs)",
            cfg.samples, cfg.features, config.repeats
        )
        .bold()
    );
    println!("{}", profiler.format_table());
    Ok(())
}
