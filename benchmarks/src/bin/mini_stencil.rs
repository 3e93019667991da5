//! Fisher Equation Mini-App
//!
//! Solves the 2-D reaction-diffusion (Fisher) equation with implicit Euler
//! time stepping, Newton iterations and a matrix-free CG solver, then
//! reports timing and iteration rates.
//!
//! Usage:
//!   mini_stencil 128 128 100 0.01
//!   mini_stencil 64 64 50 0.005 --parallel --threads 4 --output field.json

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use colored::*;
use kernbench_core::stencil::{initial_condition, timeloop, Boundary};
use kernbench_core::{
    Discretization, NewtonStatus, ParallelConfig, SolverOptions, Variant, WorkPool,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "mini_stencil")]
#[command(about = "Fisher equation mini-app: implicit Euler, Newton and matrix-free CG")]
#[command(version)]
struct Cli {
    /// Grid points along x
    nx: usize,
    /// Grid points along y
    ny: usize,
    /// Number of time steps
    nt: usize,
    /// Total simulated time
    t: f64,

    /// Evaluate the stencil on the work pool
    #[arg(long)]
    parallel: bool,

    /// Worker threads when running in parallel (default: logical CPUs)
    #[arg(long, requires = "parallel")]
    threads: Option<usize>,

    /// Maximum CG iterations per Newton step
    #[arg(long, default_value_t = SolverOptions::default().max_cg_iters)]
    max_cg: usize,

    /// Maximum Newton iterations per time step
    #[arg(long, default_value_t = SolverOptions::default().max_newton_iters)]
    max_newton: usize,

    /// Convergence tolerance for both solvers
    #[arg(long, default_value_t = SolverOptions::default().tolerance)]
    tolerance: f64,

    /// Write the final field and solver status as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct FieldDump<'a> {
    nx: usize,
    ny: usize,
    nt: usize,
    t_end: f64,
    dt: f64,
    dx: f64,
    status: &'a NewtonStatus,
    /// Row-major: point `(i, j)` at `i + j * nx`
    field: &'a [f64],
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            // stderr is already gone if this fails; the exit code still reports it
            e.print().ok();
            eprintln!("usage: mini_stencil nx ny nt t [--output <file.json>]");
            return ExitCode::from(1);
        }
    };

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

/// Returns whether every time step converged
fn run(cli: &Cli) -> Result<bool> {
    let disc = Discretization::new(cli.nx, cli.ny, cli.nt, cli.t).context("invalid arguments")?;
    let options = SolverOptions {
        max_cg_iters: cli.max_cg,
        max_newton_iters: cli.max_newton,
        tolerance: cli.tolerance,
    };
    let variant = if cli.parallel {
        Variant::Parallel
    } else {
        Variant::Compiled
    };
    let pool = if cli.parallel {
        let config = ParallelConfig {
            threads: cli.threads,
            ..ParallelConfig::default()
        };
        Some(WorkPool::new(&config).context("invalid arguments")?)
    } else {
        None
    };

    println!("{}", "========================================================================".cyan());
    println!("{}", "                      Welcome to mini-stencil!".cyan().bold());
    println!(
        "mesh :: {} * {}, dx = {:.6}",
        disc.nx, disc.ny, disc.dx
    );
    println!(
        "time :: {} time steps from 0 .. {}",
        disc.nt, cli.t
    );
    println!(
        "iteration :: CG {}, Newton {}, tolerance {:e}",
        options.max_cg_iters, options.max_newton_iters, options.tolerance
    );
    match &pool {
        Some(pool) => println!("exec :: parallel on {} worker threads", pool.threads()),
        None => println!("exec :: serial"),
    }
    println!("{}", "========================================================================".cyan());

    let boundary = Boundary::dirichlet_zero(&disc);
    let mut u = initial_condition(&disc);

    let start = Instant::now();
    let status = timeloop(&mut u, &boundary, &disc, &options, variant, pool.as_ref())?;
    let elapsed = start.elapsed().as_secs_f64();

    if status.converged {
        println!("{}", "simulation completed".green());
    } else {
        for line in failure_report(&status) {
            eprintln!("{}", line.red().bold());
        }
    }

    println!("{}", "------------------------------------------------------------------------".cyan());
    println!("simulation took {:.4} seconds", elapsed);
    println!(
        "{} conjugate gradient iterations, at rate of {:.1} iters/second",
        status.iters_cg,
        rate(status.iters_cg, elapsed)
    );
    println!(
        "{} newton iterations, at rate of {:.1} iters/second",
        status.iters_newton,
        rate(status.iters_newton, elapsed)
    );
    println!("{}", "------------------------------------------------------------------------".cyan());

    if let Some(path) = &cli.output {
        let dump = FieldDump {
            nx: disc.nx,
            ny: disc.ny,
            nt: disc.nt,
            t_end: cli.t,
            dt: disc.dt,
            dx: disc.dx,
            status: &status,
            field: &u,
        };
        let json = serde_json::to_string(&dump)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "field written");
    }

    println!("Goodbye!");
    Ok(status.converged)
}

/// Diagnostic lines for a run that stopped early
fn failure_report(status: &NewtonStatus) -> Vec<String> {
    let mut lines = Vec::with_capacity(2);
    if status.iters_cg > 0 && !status.last_cg.converged {
        lines.push(format!(
            "ERROR: CG failed to converge after {} iterations, with residual {:e}",
            status.last_cg.iters, status.last_cg.residual
        ));
    }
    lines.push(format!(
        "step {} ERROR : nonlinear iterations failed to converge",
        status.timestep
    ));
    lines
}

fn rate(iters: usize, seconds: f64) -> f64 {
    if seconds > 0.0 {
        iters as f64 / seconds
    } else {
        0.0
    }
}
