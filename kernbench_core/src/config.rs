//! Benchmark suite configuration
//!
//! Presets cover the usual problem sizes; any field can be overridden from a
//! TOML or YAML file. Missing fields fall back to the `standard` preset.

use crate::error::{KernelError, KernelResult};
use crate::kernels::JuliaParams;
use crate::parallel::ParallelConfig;
use crate::stencil::{Discretization, SolverOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Monte Carlo sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PiConfig {
    pub samples: usize,
    /// Accepted gap between the parallel and baseline estimates
    pub tolerance: f64,
}

impl Default for PiConfig {
    fn default() -> Self {
        Self {
            samples: 2_000_000,
            tolerance: 0.01,
        }
    }
}

/// Random feature matrices fed to the distance kernels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Rows in each input matrix
    pub samples: usize,
    /// Columns (features) in each input matrix
    pub features: usize,
    /// Features are drawn from `[0, scale)`
    pub scale: f64,
    /// Relative tolerance against the baseline
    pub tolerance: f64,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            samples: 400,
            features: 50,
            scale: 10.0,
            tolerance: 1e-9,
        }
    }
}

/// Toy wrapper type sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapesConfig {
    pub rectangles: usize,
    pub range_start: i64,
    pub range_stop: i64,
}

impl Default for ShapesConfig {
    fn default() -> Self {
        Self {
            rectangles: 1_000_000,
            range_start: 0,
            range_stop: 1_000_000,
        }
    }
}

/// Fisher mini-app problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StencilConfig {
    pub nx: usize,
    pub ny: usize,
    pub nt: usize,
    /// Total simulated time
    pub t_end: f64,
    pub solver: SolverOptions,
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            nx: 64,
            ny: 64,
            nt: 50,
            t_end: 0.005,
            solver: SolverOptions::default(),
        }
    }
}

impl StencilConfig {
    pub fn discretization(&self) -> KernelResult<Discretization> {
        Discretization::new(self.nx, self.ny, self.nt, self.t_end)
    }
}

/// Complete suite configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Seed for every random input
    pub seed: u64,
    /// Timed runs per variant
    pub repeats: usize,
    /// Untimed runs per variant
    pub warmup: usize,
    pub parallel: ParallelConfig,
    pub pi: PiConfig,
    pub julia: JuliaParams,
    pub distance: DistanceConfig,
    pub shapes: ShapesConfig,
    pub stencil: StencilConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl BenchConfig {
    /// Mid-sized problems, a few seconds per kernel
    pub fn standard() -> Self {
        Self {
            seed: 2024,
            repeats: 5,
            warmup: 1,
            parallel: ParallelConfig::default(),
            pi: PiConfig::default(),
            julia: JuliaParams::default(),
            distance: DistanceConfig::default(),
            shapes: ShapesConfig::default(),
            stencil: StencilConfig::default(),
        }
    }

    /// Small problems for smoke runs and CI
    pub fn quick() -> Self {
        Self {
            repeats: 3,
            warmup: 1,
            pi: PiConfig {
                samples: 100_000,
                tolerance: 0.05,
            },
            julia: JuliaParams::small(),
            distance: DistanceConfig {
                samples: 100,
                features: 10,
                ..DistanceConfig::default()
            },
            shapes: ShapesConfig {
                rectangles: 10_000,
                range_start: 0,
                range_stop: 10_000,
            },
            stencil: StencilConfig {
                nx: 32,
                ny: 32,
                nt: 10,
                t_end: 0.005,
                solver: SolverOptions::default(),
            },
            ..Self::standard()
        }
    }

    /// Large problems matching the classic tutorial sizes
    pub fn full() -> Self {
        Self {
            repeats: 10,
            warmup: 2,
            pi: PiConfig {
                samples: 20_000_000,
                tolerance: 0.005,
            },
            julia: JuliaParams {
                width: 1200,
                height: 800,
                ..JuliaParams::default()
            },
            distance: DistanceConfig {
                samples: 800,
                ..DistanceConfig::default()
            },
            shapes: ShapesConfig {
                rectangles: 10_000_000,
                range_start: 0,
                range_stop: 10_000_000,
            },
            stencil: StencilConfig {
                nx: 128,
                ny: 128,
                nt: 100,
                t_end: 0.01,
                solver: SolverOptions::default(),
            },
            ..Self::standard()
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> KernelResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "quick" => Ok(Self::quick()),
            "standard" => Ok(Self::standard()),
            "full" => Ok(Self::full()),
            other => Err(KernelError::config(format!(
                "unknown preset '{}' (expected quick, standard or full)",
                other
            ))),
        }
    }

    pub fn from_toml_str(s: &str) -> KernelResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> KernelResult<Self> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.toml`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> KernelResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let config = match ext.as_deref() {
            Some("toml") => Self::from_toml_str(&text)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text)?,
            _ => {
                return Err(KernelError::config(format!(
                    "unsupported config format: {}",
                    path.display()
                )))
            }
        };
        log::info!("loaded benchmark config from {}", path.display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> KernelResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.repeats == 0 {
            return Err(KernelError::config("repeats must be positive"));
        }
        self.parallel
            .validate()
            .map_err(|e| KernelError::config(format!("parallel: {}", e)))?;
        if self.pi.samples == 0 {
            return Err(KernelError::config("pi.samples must be positive"));
        }
        if !(self.pi.tolerance > 0.0) {
            return Err(KernelError::config("pi.tolerance must be positive"));
        }
        self.julia
            .validate()
            .map_err(|e| KernelError::config(format!("julia: {}", e)))?;
        if self.distance.samples == 0 || self.distance.features == 0 {
            return Err(KernelError::config(
                "distance.samples and distance.features must be positive",
            ));
        }
        if !(self.distance.scale.is_finite() && self.distance.scale > 0.0) {
            return Err(KernelError::config("distance.scale must be positive"));
        }
        if self.shapes.range_stop <= self.shapes.range_start {
            return Err(KernelError::config(
                "shapes.range_start must be below shapes.range_stop",
            ));
        }
        self.stencil
            .discretization()
            .map_err(|e| KernelError::config(format!("stencil: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_valid() {
        for name in ["quick", "standard", "full"] {
            let config = BenchConfig::preset(name).unwrap();
            assert!(config.validate().is_ok(), "preset {} invalid", name);
        }
        assert!(BenchConfig::preset("huge").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = BenchConfig::quick();
        let text = config.to_toml_string().unwrap();
        let parsed = BenchConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = BenchConfig::from_toml_str(
            r#"
            repeats = 2

            [parallel]
            threads = 2
            chunk_rows = 4

            [julia]
            width = 64
            height = 32
            "#,
        )
        .unwrap();
        assert_eq!(parsed.repeats, 2);
        assert_eq!(parsed.parallel.threads, Some(2));
        assert_eq!(parsed.parallel.chunk_rows, 4);
        assert_eq!(parsed.julia.width, 64);
        assert_eq!(parsed.julia.max_iter, JuliaParams::default().max_iter);
        assert_eq!(parsed.pi, PiConfig::default());
    }

    #[test]
    fn test_yaml_config() {
        let parsed = BenchConfig::from_yaml_str(
            "seed: 7\ndistance:\n  samples: 12\n  features: 3\n",
        )
        .unwrap();
        assert_eq!(parsed.seed, 7);
        assert_eq!(parsed.distance.samples, 12);
        assert_eq!(parsed.distance.features, 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = BenchConfig::from_toml_str("repeats = 0").unwrap_err();
        assert!(matches!(err, KernelError::Config(_)));

        let err = BenchConfig::from_toml_str("[shapes]\nrange_start = 5\nrange_stop = 5")
            .unwrap_err();
        assert!(matches!(err, KernelError::Config(_)));

        let err = BenchConfig::from_toml_str("[stencil]\nnx = 1").unwrap_err();
        assert!(matches!(err, KernelError::Config(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = std::env::temp_dir().join("kernbench_config_test.ini");
        std::fs::write(&dir, "repeats = 1").unwrap();
        assert!(BenchConfig::load(&dir).is_err());
        let _ = std::fs::remove_file(&dir);
    }
}
