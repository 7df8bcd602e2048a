// crates/cocl-engine/src/spmd.rs

//! `cluster` entry point: validation, rank launch, and result collection.

use std::thread;

use cocl_comm::Communicator;
use cocl_core::{validate_labels, DenseMatrix, LabelAxis, PartitionPlan};

use crate::controller::{run_rank, RankOutcome};
use crate::error::EngineError;
use crate::stats::ClusterStats;
use crate::ClusterOpts;

/// Poison the communicator if the rank body unwinds, so peers blocked at a
/// collective fail over instead of waiting forever.
struct AbortOnUnwind<'a>(&'a Communicator);

impl Drop for AbortOnUnwind<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// Co-cluster `matrix`, mutating `row_labels` and `col_labels` in place.
///
/// Both label vectors carry the initial assignment on entry and the final
/// one on return. All preconditions (shape agreement, label ranges, positive
/// R/C/worker counts) are checked before any rank thread is launched.
///
/// Reductions are combined in a fixed order, so identical runs with an
/// identical worker count are bitwise reproducible; changing the worker
/// count may perturb accumulated sums in their least significant bits and,
/// on near-tied inputs, the resulting labels.
///
/// # Errors
/// Returns a configuration error before launch, or the collective-layer
/// failure observed by the lowest-numbered failing rank if the run aborts.
pub fn cluster(
    matrix: &DenseMatrix,
    row_labels: &mut [u32],
    col_labels: &mut [u32],
    opts: &ClusterOpts,
) -> Result<ClusterStats, EngineError> {
    validate(matrix, row_labels, col_labels, opts)?;

    let world = opts.workers;
    let row_plan = PartitionPlan::new(matrix.num_rows(), world);
    let col_plan = PartitionPlan::new(matrix.num_cols(), world);
    let comm = Communicator::new(world);

    let outcomes: Vec<Result<RankOutcome, cocl_comm::CommError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..world)
            .map(|rank| {
                let comm = &comm;
                let row_plan = &row_plan;
                let col_plan = &col_plan;
                // Each rank starts from its own replica of the initial labels.
                let rl = row_labels.to_vec();
                let cl = col_labels.to_vec();
                s.spawn(move || {
                    let _guard = AbortOnUnwind(comm);
                    let out = run_rank(rank, comm, matrix, rl, cl, row_plan, col_plan, opts);
                    if out.is_err() {
                        comm.abort();
                    }
                    out
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(outcome) => outcome,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    });

    let mut finished = Vec::with_capacity(world);
    for outcome in outcomes {
        finished.push(outcome?);
    }
    debug_assert!(
        finished
            .iter()
            .all(|o| o.row_labels == finished[0].row_labels
                && o.col_labels == finished[0].col_labels),
        "label replicas diverged across ranks"
    );

    let first = finished.swap_remove(0);
    row_labels.copy_from_slice(&first.row_labels);
    col_labels.copy_from_slice(&first.col_labels);
    Ok(first.stats)
}

fn validate(
    matrix: &DenseMatrix,
    row_labels: &[u32],
    col_labels: &[u32],
    opts: &ClusterOpts,
) -> Result<(), EngineError> {
    if matrix.is_empty() {
        return Err(EngineError::EmptyMatrix {
            num_rows: matrix.num_rows(),
            num_cols: matrix.num_cols(),
        });
    }
    if opts.row_clusters == 0 || opts.col_clusters == 0 {
        return Err(EngineError::ZeroClusters {
            row_clusters: opts.row_clusters,
            col_clusters: opts.col_clusters,
        });
    }
    if opts.workers == 0 {
        return Err(EngineError::ZeroWorkers);
    }
    validate_labels(
        LabelAxis::Rows,
        row_labels,
        matrix.num_rows(),
        opts.row_clusters,
    )?;
    validate_labels(
        LabelAxis::Columns,
        col_labels,
        matrix.num_cols(),
        opts.col_clusters,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_matrix() {
        let m = DenseMatrix::from_vec(0, 4, vec![]).unwrap();
        let err = cluster(&m, &mut [], &mut [0; 4], &ClusterOpts::new(1, 1)).unwrap_err();
        assert!(matches!(err, EngineError::EmptyMatrix { .. }));
    }

    #[test]
    fn rejects_zero_clusters() {
        let m = DenseMatrix::from_vec(1, 1, vec![0.0]).unwrap();
        let err = cluster(&m, &mut [0], &mut [0], &ClusterOpts::new(0, 1)).unwrap_err();
        assert!(matches!(err, EngineError::ZeroClusters { .. }));
    }

    #[test]
    fn rejects_zero_workers() {
        let m = DenseMatrix::from_vec(1, 1, vec![0.0]).unwrap();
        let opts = ClusterOpts::new(1, 1).with_workers(0);
        let err = cluster(&m, &mut [0], &mut [0], &opts).unwrap_err();
        assert!(matches!(err, EngineError::ZeroWorkers));
    }

    #[test]
    fn rejects_out_of_range_initial_labels() {
        let m = DenseMatrix::from_vec(2, 2, vec![0.0; 4]).unwrap();
        let opts = ClusterOpts::new(2, 2).with_workers(1);
        let err = cluster(&m, &mut [0, 2], &mut [0, 1], &opts).unwrap_err();
        assert!(matches!(err, EngineError::Labels(_)));
    }
}
