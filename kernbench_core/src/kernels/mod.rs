//! Numeric kernels, each available in several implementation variants.

pub mod distance;
pub mod julia;
pub mod montecarlo;

use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use distance::{distance_matrix, euclidean_broadcast_profiled, Metric};
pub use julia::{julia_set, JuliaParams};
pub use montecarlo::estimate_pi;

/// Implementation strategy of a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Naive per-element code with dynamic dispatch and checked indexing
    Baseline,
    /// Array-at-a-time code built from whole-array temporaries
    Vectorized,
    /// Tight monomorphized loop over contiguous slices
    Compiled,
    /// Compiled loop body distributed over a work pool
    Parallel,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Baseline,
        Variant::Vectorized,
        Variant::Compiled,
        Variant::Parallel,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Baseline => "baseline",
            Variant::Vectorized => "vectorized",
            Variant::Compiled => "compiled",
            Variant::Parallel => "parallel",
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Variant::Parallel)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baseline" | "naive" => Ok(Variant::Baseline),
            "vectorized" | "broadcast" => Ok(Variant::Vectorized),
            "compiled" => Ok(Variant::Compiled),
            "parallel" => Ok(Variant::Parallel),
            other => Err(KernelError::ParseError(format!(
                "unknown variant '{}'",
                other
            ))),
        }
    }
}
