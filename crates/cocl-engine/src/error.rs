// crates/cocl-engine/src/error.rs

//! Engine error taxonomy.
//!
//! Configuration problems are rejected before any rank thread is launched;
//! once the SPMD loop is running the only failure mode is a poisoned
//! collective (a peer rank failed), which fans out to every rank so nobody
//! blocks forever.

use cocl_comm::CommError;
use cocl_core::LabelError;
use thiserror::Error;

/// Failures surfaced by [`cluster`](crate::cluster).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The matrix has zero cells.
    #[error("matrix has no cells ({num_rows}x{num_cols})")]
    EmptyMatrix {
        /// Declared row count.
        num_rows: usize,
        /// Declared column count.
        num_cols: usize,
    },
    /// R or C is zero.
    #[error("cluster counts must be positive (R={row_clusters}, C={col_clusters})")]
    ZeroClusters {
        /// Requested row clusters.
        row_clusters: u32,
        /// Requested column clusters.
        col_clusters: u32,
    },
    /// World size is zero.
    #[error("worker count must be positive")]
    ZeroWorkers,
    /// An initial label vector failed validation.
    #[error(transparent)]
    Labels(#[from] LabelError),
    /// A collective failed; all ranks were aborted.
    #[error(transparent)]
    Comm(#[from] CommError),
}
