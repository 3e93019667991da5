//! # kernbench
//!
//! Numeric kernels written as a naive baseline and as progressively optimized
//! variants, timed against each other and checked for numeric equivalence.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kernbench::prelude::*;
//!
//! let pool = WorkPool::new(&ParallelConfig::default()).unwrap();
//! let params = JuliaParams::default();
//!
//! let baseline = julia_set(&params, Variant::Baseline, None).unwrap();
//! let parallel = julia_set(&params, Variant::Parallel, Some(&pool)).unwrap();
//! assert_eq!(baseline, parallel);
//! ```
//!
//! ## Features
//!
//! - **Four variants per kernel**: baseline, vectorized, compiled, parallel
//! - **Fixed-chunk work sharing** on a named rayon pool
//! - **Fisher equation mini-app** with Newton and matrix-free CG
//! - **Section profiler** for locating hot phases

// Re-export core components
pub use kernbench_core::{self, *};

// Re-export the matrix crate used in kernel signatures
pub use nalgebra;

// Re-export serde at crate root for downstream config types
pub use serde;

/// The kernbench prelude - everything needed to run and compare kernels
pub mod prelude {
    // ============================================
    // Kernels
    // ============================================
    pub use kernbench_core::kernels::{
        distance_matrix, estimate_pi, euclidean_broadcast_profiled, julia_set, JuliaParams,
        Metric, Variant,
    };

    // ============================================
    // Toy wrapper types
    // ============================================
    pub use kernbench_core::shapes::{RangeBuffer, Rectangle, RectangleSet};

    // ============================================
    // Mini-app
    // ============================================
    pub use kernbench_core::stencil::{
        diffusion, initial_condition, timeloop, Boundary, CgStatus, Discretization, NewtonStatus,
        SolverOptions,
    };

    // ============================================
    // Execution, profiling and configuration
    // ============================================
    pub use kernbench_core::config::BenchConfig;
    pub use kernbench_core::parallel::{ParallelConfig, WorkPool};
    pub use kernbench_core::profiling::{Profiler, SectionStats};

    // ============================================
    // Error types
    // ============================================
    pub use kernbench_core::error::{KernelError, KernelResult};

    // ============================================
    // Common dependencies
    // ============================================
    pub use anyhow::{anyhow, bail, ensure, Context, Result};
    pub use nalgebra::DMatrix;
    pub use serde::{Deserialize, Serialize};
}
