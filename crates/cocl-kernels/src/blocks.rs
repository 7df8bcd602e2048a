// crates/cocl-kernels/src/blocks.rs

//! Per-slab accumulation of cluster sums and counts.
//!
//! For every cell `(i, j)` in the local row slab the cluster id is
//! `rl[i] * C + cl[j]`; the cell value is added (as `f64`) to the sum bin
//! and the count bin at that id. The caller all-reduces both vectors across
//! ranks and forms the block-average matrix from the global totals.

use std::ops::Range;

use cocl_core::DenseMatrix;
use rayon::prelude::*;

use crate::chunk_len;

const MIN_ROWS_PER_CHUNK: usize = 128;

/// Accumulate cluster sums and counts over `rows`, the caller's row slab.
///
/// `row_labels` and `col_labels` are the full (globally consistent) label
/// vectors; only rows inside the slab are touched, indexed by their global
/// row number. Returns `(sums, counts)` of length `R * C`, row-major by
/// row cluster.
#[must_use]
pub fn accumulate_blocks(
    matrix: &DenseMatrix,
    row_labels: &[u32],
    col_labels: &[u32],
    rows: Range<usize>,
    row_clusters: usize,
    col_clusters: usize,
) -> (Vec<f64>, Vec<u64>) {
    debug_assert!(rows.end <= matrix.num_rows());
    debug_assert_eq!(row_labels.len(), matrix.num_rows());
    debug_assert_eq!(col_labels.len(), matrix.num_cols());

    let bins = row_clusters * col_clusters;
    let chunk = chunk_len(rows.len(), MIN_ROWS_PER_CHUNK);
    let starts: Vec<usize> = rows.clone().step_by(chunk).collect();

    let partials: Vec<(Vec<f64>, Vec<u64>)> = starts
        .par_iter()
        .map(|&start| {
            let end = (start + chunk).min(rows.end);
            let mut sums = vec![0f64; bins];
            let mut counts = vec![0u64; bins];
            for i in start..end {
                let base = row_labels[i] as usize * col_clusters;
                for (j, &x) in matrix.row(i).iter().enumerate() {
                    let cid = base + col_labels[j] as usize;
                    sums[cid] += f64::from(x);
                    counts[cid] += 1;
                }
            }
            (sums, counts)
        })
        .collect();

    // Chunk-ordered combine on the calling thread.
    let mut sums = vec![0f64; bins];
    let mut counts = vec![0u64; bins];
    for (chunk_sums, chunk_counts) in partials {
        for (acc, value) in sums.iter_mut().zip(chunk_sums) {
            *acc += value;
        }
        for (acc, value) in counts.iter_mut().zip(chunk_counts) {
            *acc += value;
        }
    }
    (sums, counts)
}
