// crates/cocl-engine/src/averages.rs

//! Block-average matrix computation.

use std::ops::Range;

use cocl_comm::{CommError, Communicator};
use cocl_core::DenseMatrix;

/// Compute the R×C block-average matrix for the current labeling.
///
/// Each rank accumulates cluster sums and counts over its row slab, both are
/// sum-reduced across ranks, and every rank forms the same `f32` averages
/// from the global `f64` totals. A block with no members averages to zero;
/// such a block cannot attract a row or column away from any non-empty block
/// covering the same entries except in pathological inputs, so it needs no
/// further handling.
#[allow(clippy::too_many_arguments)]
pub(crate) fn compute_block_averages(
    matrix: &DenseMatrix,
    row_labels: &[u32],
    col_labels: &[u32],
    row_slab: Range<usize>,
    row_clusters: usize,
    col_clusters: usize,
    comm: &Communicator,
    rank: usize,
) -> Result<Vec<f32>, CommError> {
    let (mut sums, mut counts) = cocl_kernels::accumulate_blocks(
        matrix,
        row_labels,
        col_labels,
        row_slab,
        row_clusters,
        col_clusters,
    );
    comm.all_reduce_sum_f64(rank, &mut sums)?;
    comm.all_reduce_sum_u64(rank, &mut counts)?;

    Ok(sums
        .iter()
        .zip(counts.iter())
        .map(|(&sum, &count)| {
            if count > 0 {
                (sum / count as f64) as f32
            } else {
                0.0
            }
        })
        .collect())
}
