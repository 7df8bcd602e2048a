// crates/cocl-engine/src/phases.rs

//! Row and column reassignment phases.
//!
//! Both phases follow the same scatter → local kernel → all-gather →
//! all-reduce pattern: the rank copies its slab out of the replicated label
//! vector, reassigns it locally, publishes the updated slab to every rank,
//! and reduces the change count (and, for columns, the error total) to
//! globally consistent values.

use cocl_comm::{CommError, Communicator};
use cocl_core::{DenseMatrix, PartitionPlan};
use cocl_kernels::{assign_cols, assign_rows};

/// Globally-reduced outcome of one phase.
pub(crate) struct PhaseOutcome {
    pub changes: u64,
    pub error: f64,
}

/// Reassign this rank's row slab and republish the full row labeling.
#[allow(clippy::too_many_arguments)]
pub(crate) fn row_phase(
    matrix: &DenseMatrix,
    averages: &[f32],
    row_clusters: usize,
    col_clusters: usize,
    row_labels: &mut [u32],
    col_labels: &[u32],
    plan: &PartitionPlan,
    comm: &Communicator,
    rank: usize,
) -> Result<PhaseOutcome, CommError> {
    let slab = plan.slab(rank);
    let mut local = row_labels[slab.clone()].to_vec();
    let out = assign_rows(
        matrix,
        averages,
        row_clusters,
        col_clusters,
        col_labels,
        slab,
        &mut local,
    );
    comm.all_gather_varying(rank, &local, plan, row_labels)?;

    let mut changes = [out.changes];
    comm.all_reduce_sum_u64(rank, &mut changes)?;
    // Row error stays rank-local; the iteration's reported error comes from
    // the column phase.
    Ok(PhaseOutcome {
        changes: changes[0],
        error: out.error,
    })
}

/// Reassign this rank's column slab against the freshly published row
/// labels, republish the full column labeling, and reduce the iteration's
/// total reconstruction error.
#[allow(clippy::too_many_arguments)]
pub(crate) fn col_phase(
    matrix: &DenseMatrix,
    averages: &[f32],
    row_clusters: usize,
    col_clusters: usize,
    row_labels: &[u32],
    col_labels: &mut [u32],
    plan: &PartitionPlan,
    comm: &Communicator,
    rank: usize,
) -> Result<PhaseOutcome, CommError> {
    let slab = plan.slab(rank);
    let mut local = col_labels[slab.clone()].to_vec();
    let out = assign_cols(
        matrix,
        averages,
        row_clusters,
        col_clusters,
        row_labels,
        slab,
        &mut local,
    );
    comm.all_gather_varying(rank, &local, plan, col_labels)?;

    let mut changes = [out.changes];
    comm.all_reduce_sum_u64(rank, &mut changes)?;
    let mut error = [out.error];
    comm.all_reduce_sum_f64(rank, &mut error)?;
    Ok(PhaseOutcome {
        changes: changes[0],
        error: error[0],
    })
}
