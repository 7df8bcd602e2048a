// crates/cocl-engine/src/controller.rs

//! Per-rank iteration loop.

use cocl_comm::{CommError, Communicator};
use cocl_core::{DenseMatrix, PartitionPlan};
use tracing::info;

use crate::averages::compute_block_averages;
use crate::phases::{col_phase, row_phase};
use crate::stats::{ClusterStats, IterationStats};
use crate::ClusterOpts;

/// A finished rank's view of the run. Labels are identical on every rank;
/// the engine reports rank 0's copies.
pub(crate) struct RankOutcome {
    pub row_labels: Vec<u32>,
    pub col_labels: Vec<u32>,
    pub stats: ClusterStats,
}

/// The SPMD rank body: block averages, row phase, column phase, repeat until
/// no label changes or the iteration cap is reached.
///
/// Every rank executes the same sequence of collectives in the same order;
/// the block-average matrix is rebuilt from the current labeling at the top
/// of each iteration and never carried across iterations.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_rank(
    rank: usize,
    comm: &Communicator,
    matrix: &DenseMatrix,
    mut row_labels: Vec<u32>,
    mut col_labels: Vec<u32>,
    row_plan: &PartitionPlan,
    col_plan: &PartitionPlan,
    opts: &ClusterOpts,
) -> Result<RankOutcome, CommError> {
    let row_clusters = opts.row_clusters as usize;
    let col_clusters = opts.col_clusters as usize;
    let cells = matrix.num_cells() as f64;
    let mut stats = ClusterStats::default();

    for iteration in 0..opts.max_iterations {
        let averages = compute_block_averages(
            matrix,
            &row_labels,
            &col_labels,
            row_plan.slab(rank),
            row_clusters,
            col_clusters,
            comm,
            rank,
        )?;

        let rows = row_phase(
            matrix,
            &averages,
            row_clusters,
            col_clusters,
            &mut row_labels,
            &col_labels,
            row_plan,
            comm,
            rank,
        )?;
        // Row labels must be fully published before any column work starts.
        comm.barrier()?;
        let cols = col_phase(
            matrix,
            &averages,
            row_clusters,
            col_clusters,
            &row_labels,
            &mut col_labels,
            col_plan,
            comm,
            rank,
        )?;

        let mean_error = cols.error / cells;
        if rank == 0 {
            info!(
                iteration,
                row_changes = rows.changes,
                col_changes = cols.changes,
                mean_error,
                "iteration complete"
            );
        }
        stats.iterations.push(IterationStats {
            iteration,
            row_changes: rows.changes,
            col_changes: cols.changes,
            total_error: cols.error,
            mean_error,
        });

        if rows.changes + cols.changes == 0 {
            stats.converged = true;
            break;
        }
    }

    Ok(RankOutcome {
        row_labels,
        col_labels,
        stats,
    })
}
