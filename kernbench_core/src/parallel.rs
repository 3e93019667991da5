//! Work-sharing pool for the parallel kernel variants.
//!
//! Kernels never spawn threads themselves. They hand a mutable output slice
//! (or a number of independent chunks) to a [`WorkPool`], which splits the
//! work into fixed-size contiguous chunks and lets rayon hand those chunks to
//! its workers. Chunks are disjoint, so kernels need no locking.

use crate::error::{KernelError, KernelResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default number of Monte Carlo samples drawn per chunk
pub const DEFAULT_CHUNK_SAMPLES: usize = 1 << 16;

/// Work-sharing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads (None = one per logical CPU)
    pub threads: Option<usize>,
    /// Output rows handed to a worker at a time
    pub chunk_rows: usize,
    /// Random samples handed to a worker at a time
    pub chunk_samples: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            threads: None,
            chunk_rows: 1,
            chunk_samples: DEFAULT_CHUNK_SAMPLES,
        }
    }
}

impl ParallelConfig {
    /// Configuration with a fixed worker count
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.threads == Some(0) {
            return Err(KernelError::invalid_input(
                "worker thread count must be positive",
            ));
        }
        if self.chunk_rows == 0 || self.chunk_samples == 0 {
            return Err(KernelError::invalid_input("chunk sizes must be positive"));
        }
        Ok(())
    }
}

/// Fixed-size rayon pool with a static chunking policy
#[derive(Debug, Clone)]
pub struct WorkPool {
    pool: Arc<rayon::ThreadPool>,
    threads: usize,
    config: ParallelConfig,
}

impl WorkPool {
    /// Build a named worker pool from the configuration
    pub fn new(config: &ParallelConfig) -> KernelResult<Self> {
        config.validate()?;
        let threads = config.threads.unwrap_or_else(num_cpus::get);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("kernbench-worker-{}", i))
            .build()?;

        log::debug!(
            "work pool ready: {} threads, {} rows/chunk, {} samples/chunk",
            threads,
            config.chunk_rows,
            config.chunk_samples
        );

        Ok(Self {
            pool: Arc::new(pool),
            threads,
            config: config.clone(),
        })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Run a closure inside the pool
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        self.pool.install(op)
    }

    /// Split `out` into contiguous chunks of `chunk_len` elements and call
    /// `f(chunk_index, chunk)` for each chunk on the pool.
    ///
    /// The last chunk may be shorter. A `chunk_len` of zero is treated as one.
    pub fn for_each_chunk<T, F>(&self, out: &mut [T], chunk_len: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        let chunk_len = chunk_len.max(1);
        self.pool.install(|| {
            out.par_chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(index, chunk)| f(index, chunk))
        });
    }

    /// Evaluate `map(k)` for every chunk index `k in 0..chunks` on the pool
    /// and fold the partial results with `reduce`.
    ///
    /// `reduce` must be associative; `identity` must be its neutral element.
    pub fn map_reduce<T, M, R>(&self, chunks: usize, identity: T, map: M, reduce: R) -> T
    where
        T: Send + Sync + Clone,
        M: Fn(usize) -> T + Send + Sync,
        R: Fn(T, T) -> T + Send + Sync,
    {
        self.pool.install(|| {
            (0..chunks)
                .into_par_iter()
                .map(&map)
                .reduce(|| identity.clone(), &reduce)
        })
    }
}
