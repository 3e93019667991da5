//! # kernbench core
//!
//! Small numeric kernels written several ways, from a naive baseline to a
//! chunked parallel loop, so the variants can be timed against each other
//! and checked for equivalence.
//!
//! - **Kernels**: Monte Carlo π, Julia set, Euclidean/Cityblock distance matrices
//! - **Shapes**: value types over native buffers (rectangles, range buffer)
//! - **Stencil**: the 2-D Fisher equation mini-app (Newton + matrix-free CG)
//! - **Parallel**: fixed-chunk work sharing on a rayon pool
//! - **Profiling**: per-section hit counts and timings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kernbench_core::{estimate_pi, ParallelConfig, Variant, WorkPool};
//!
//! let pool = WorkPool::new(&ParallelConfig::default()).unwrap();
//! let baseline = estimate_pi(1_000_000, 42, Variant::Baseline, None).unwrap();
//! let parallel = estimate_pi(1_000_000, 42, Variant::Parallel, Some(&pool)).unwrap();
//! assert!((baseline - parallel).abs() < 0.01);
//! ```

pub mod config;
pub mod error;
pub mod kernels;
pub mod parallel;
pub mod profiling;
pub mod shapes;
pub mod stencil;

// Re-export commonly used types for easy access
pub use config::BenchConfig;
pub use error::{KernelError, KernelResult};
pub use kernels::{
    distance_matrix, estimate_pi, euclidean_broadcast_profiled, julia_set, JuliaParams, Metric,
    Variant,
};
pub use parallel::{ParallelConfig, WorkPool};
pub use profiling::{Profiler, SectionStats};
pub use shapes::{RangeBuffer, Rectangle, RectangleSet};
pub use stencil::{Boundary, Discretization, NewtonStatus, SolverOptions};
