// crates/cocl-engine/src/opts.rs

//! Clustering run options.

use std::num::NonZeroUsize;

/// Default iteration cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 25;

/// Options for one [`cluster`](crate::cluster) run.
///
/// `row_clusters`/`col_clusters` are fixed by the caller; the engine never
/// chooses R or C on its own.
#[derive(Clone, Debug)]
pub struct ClusterOpts {
    /// Number of row clusters R (≥ 1).
    pub row_clusters: u32,
    /// Number of column clusters C (≥ 1).
    pub col_clusters: u32,
    /// Iteration cap; the loop may end earlier on convergence.
    pub max_iterations: usize,
    /// Worker ranks (world size, ≥ 1).
    pub workers: usize,
}

impl ClusterOpts {
    /// Options with the default iteration cap and one rank per available
    /// CPU.
    #[must_use]
    pub fn new(row_clusters: u32, col_clusters: u32) -> Self {
        Self {
            row_clusters,
            col_clusters,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            workers: default_workers(),
        }
    }

    /// Override the iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Override the world size.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// Default world size: available parallelism, or 1 if unknown.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
