// crates/cocl-engine/src/stats.rs

//! Per-run clustering statistics.
//!
//! Change counts and error totals are all-reduced, so every rank observes
//! identical values; the engine reports rank 0's view.

use serde::Serialize;

/// One iteration's globally-reduced diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct IterationStats {
    /// Zero-based iteration index.
    pub iteration: usize,
    /// Rows whose label changed this iteration (across all ranks).
    pub row_changes: u64,
    /// Columns whose label changed this iteration (across all ranks).
    pub col_changes: u64,
    /// Total squared reconstruction error after the column phase.
    pub total_error: f64,
    /// `total_error / (num_rows * num_cols)`: mean squared per-cell error.
    pub mean_error: f64,
}

/// Diagnostics for a whole clustering run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ClusterStats {
    /// One entry per executed iteration, in order.
    pub iterations: Vec<IterationStats>,
    /// Whether the run ended because an iteration changed no label (as
    /// opposed to hitting the iteration cap).
    pub converged: bool,
}

impl ClusterStats {
    /// Number of iterations executed.
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.iterations.len()
    }

    /// Mean squared per-cell error of the last iteration, if any ran.
    #[must_use]
    pub fn final_error(&self) -> Option<f64> {
        self.iterations.last().map(|it| it.mean_error)
    }
}
