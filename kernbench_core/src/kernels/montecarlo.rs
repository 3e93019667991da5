//! Monte Carlo estimation of π.
//!
//! Samples points uniformly in the unit square and counts how many land
//! inside the quarter circle of radius one; the hit ratio approaches π/4.

use super::Variant;
use crate::error::{KernelError, KernelResult};
use crate::parallel::WorkPool;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Estimate π from `samples` random points drawn from a generator seeded
/// with `seed`.
///
/// The serial variants consume the generator in the same order and return
/// identical estimates. The parallel variant draws chunk `k` from stream `k`
/// of the same seed, so its estimate does not depend on the worker count.
pub fn estimate_pi(
    samples: usize,
    seed: u64,
    variant: Variant,
    pool: Option<&WorkPool>,
) -> KernelResult<f64> {
    if samples == 0 {
        return Err(KernelError::invalid_input(
            "number of samples must be positive",
        ));
    }

    let hits = match variant {
        Variant::Baseline => {
            let mut rng: Box<dyn RngCore> = Box::new(ChaCha8Rng::seed_from_u64(seed));
            hits_dynamic(rng.as_mut(), samples)
        }
        Variant::Vectorized => hits_vectorized(&mut ChaCha8Rng::seed_from_u64(seed), samples),
        Variant::Compiled => hits_compiled(&mut ChaCha8Rng::seed_from_u64(seed), samples),
        Variant::Parallel => {
            let pool = pool.ok_or_else(|| {
                KernelError::invalid_input("parallel variant requires a work pool")
            })?;
            hits_parallel(pool, seed, samples)
        }
    };

    log::trace!("pi[{}]: {} hits of {} samples", variant, hits, samples);
    Ok(4.0 * hits as f64 / samples as f64)
}

fn hits_dynamic(rng: &mut dyn RngCore, samples: usize) -> u64 {
    let mut hits = 0u64;
    for _ in 0..samples {
        let x: f64 = rng.gen();
        let y: f64 = rng.gen();
        if x * x + y * y < 1.0 {
            hits += 1;
        }
    }
    hits
}

fn hits_vectorized<R: Rng>(rng: &mut R, samples: usize) -> u64 {
    let coords: Vec<f64> = (0..2 * samples).map(|_| rng.gen()).collect();
    let radii: Vec<f64> = coords
        .chunks_exact(2)
        .map(|p| p[0] * p[0] + p[1] * p[1])
        .collect();
    radii.iter().filter(|&&r| r < 1.0).count() as u64
}

#[inline]
fn hits_compiled<R: Rng>(rng: &mut R, samples: usize) -> u64 {
    (0..samples)
        .filter(|_| {
            let x: f64 = rng.gen();
            let y: f64 = rng.gen();
            x * x + y * y < 1.0
        })
        .count() as u64
}

fn hits_parallel(pool: &WorkPool, seed: u64, samples: usize) -> u64 {
    let chunk = pool.config().chunk_samples.max(1);
    let chunks = samples.div_ceil(chunk);

    pool.map_reduce(
        chunks,
        0u64,
        |k| {
            let start = k * chunk;
            let len = chunk.min(samples - start);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(k as u64);
            hits_compiled(&mut rng, len)
        },
        |a, b| a + b,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::ParallelConfig;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zero_samples_rejected() {
        let err = estimate_pi(0, 1, Variant::Compiled, None).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_serial_variants_identical() {
        let baseline = estimate_pi(20_000, 42, Variant::Baseline, None).unwrap();
        let vectorized = estimate_pi(20_000, 42, Variant::Vectorized, None).unwrap();
        let compiled = estimate_pi(20_000, 42, Variant::Compiled, None).unwrap();
        assert_eq!(baseline, vectorized);
        assert_eq!(baseline, compiled);
    }

    #[test]
    fn test_parallel_requires_pool() {
        assert!(estimate_pi(100, 1, Variant::Parallel, None).is_err());
    }

    #[test]
    fn test_parallel_independent_of_thread_count() {
        let config = ParallelConfig {
            chunk_samples: 1000,
            ..ParallelConfig::with_threads(1)
        };
        let single = WorkPool::new(&config).unwrap();
        let many = WorkPool::new(&ParallelConfig {
            threads: Some(4),
            ..config
        })
        .unwrap();

        let a = estimate_pi(25_500, 7, Variant::Parallel, Some(&single)).unwrap();
        let b = estimate_pi(25_500, 7, Variant::Parallel, Some(&many)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_estimate_close_to_pi() {
        let pool = WorkPool::new(&ParallelConfig::with_threads(2)).unwrap();
        let serial = estimate_pi(400_000, 3, Variant::Compiled, None).unwrap();
        let parallel = estimate_pi(400_000, 3, Variant::Parallel, Some(&pool)).unwrap();
        assert_abs_diff_eq!(serial, std::f64::consts::PI, epsilon = 0.02);
        assert_abs_diff_eq!(parallel, serial, epsilon = 0.02);
    }
}
