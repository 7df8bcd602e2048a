// crates/cocl-kernels/src/assign.rs

//! Row and column reassignment kernels.
//!
//! For each row (column) in the caller's slab, the kernel evaluates the
//! squared reconstruction error of every candidate label against the current
//! block-average matrix and writes back the argmin. Ties go to the current
//! label when it participates in the tie, otherwise to the smallest label
//! index, so a converged labeling is a fixed point.

use std::ops::Range;

use cocl_core::DenseMatrix;
use rayon::prelude::*;

use crate::chunk_len;

const MIN_ITEMS_PER_CHUNK: usize = 64;

/// Outcome of one reassignment pass over a slab.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SlabAssignment {
    /// Number of slab entries whose label changed.
    pub changes: u64,
    /// Sum of best-candidate squared errors over the slab.
    pub error: f64,
}

/// Pick the minimizing label, preferring the current one among ties.
fn argmin_label(dist: &[f64], current: u32) -> (u32, f64) {
    debug_assert!(!dist.is_empty());
    let mut best = 0usize;
    let mut best_dist = dist[0];
    for (r, &d) in dist.iter().enumerate().skip(1) {
        if d < best_dist {
            best = r;
            best_dist = d;
        }
    }
    let current_dist = dist[current as usize];
    if current_dist == best_dist {
        (current, current_dist)
    } else {
        (u32::try_from(best).unwrap_or(u32::MAX), best_dist)
    }
}

/// Reassign the rows in `rows` (the caller's slab).
///
/// `slab_labels` holds exactly the slab's current labels and is rewritten in
/// place; `col_labels` is the full, already-published column labeling.
/// Distances are accumulated in `f64` over all columns of each row.
#[must_use]
pub fn assign_rows(
    matrix: &DenseMatrix,
    averages: &[f32],
    row_clusters: usize,
    col_clusters: usize,
    col_labels: &[u32],
    rows: Range<usize>,
    slab_labels: &mut [u32],
) -> SlabAssignment {
    debug_assert_eq!(slab_labels.len(), rows.len());
    debug_assert_eq!(averages.len(), row_clusters * col_clusters);
    debug_assert_eq!(col_labels.len(), matrix.num_cols());

    let chunk = chunk_len(rows.len(), MIN_ITEMS_PER_CHUNK);
    let slab_start = rows.start;

    let partials: Vec<(u64, f64)> = slab_labels
        .par_chunks_mut(chunk)
        .enumerate()
        .map(|(chunk_idx, labels)| {
            let base = slab_start + chunk_idx * chunk;
            let mut changes = 0u64;
            let mut error = 0f64;
            let mut dist = vec![0f64; row_clusters];
            for (k, label) in labels.iter_mut().enumerate() {
                let row = matrix.row(base + k);
                dist.fill(0.0);
                for (j, &x) in row.iter().enumerate() {
                    let c = col_labels[j] as usize;
                    let x = f64::from(x);
                    for (r, d) in dist.iter_mut().enumerate() {
                        let diff = f64::from(averages[r * col_clusters + c]) - x;
                        *d += diff * diff;
                    }
                }
                let current = *label;
                let (best, best_dist) = argmin_label(&dist, current);
                changes += u64::from(best != current);
                error += best_dist;
                *label = best;
            }
            (changes, error)
        })
        .collect();

    let mut out = SlabAssignment::default();
    for (changes, error) in partials {
        out.changes += changes;
        out.error += error;
    }
    out
}

/// Reassign the columns in `cols` (the caller's slab).
///
/// Symmetric to [`assign_rows`], walking each column top to bottom against
/// the full, already-published row labeling.
#[must_use]
pub fn assign_cols(
    matrix: &DenseMatrix,
    averages: &[f32],
    row_clusters: usize,
    col_clusters: usize,
    row_labels: &[u32],
    cols: Range<usize>,
    slab_labels: &mut [u32],
) -> SlabAssignment {
    debug_assert_eq!(slab_labels.len(), cols.len());
    debug_assert_eq!(averages.len(), row_clusters * col_clusters);
    debug_assert_eq!(row_labels.len(), matrix.num_rows());

    let chunk = chunk_len(cols.len(), MIN_ITEMS_PER_CHUNK);
    let slab_start = cols.start;

    let partials: Vec<(u64, f64)> = slab_labels
        .par_chunks_mut(chunk)
        .enumerate()
        .map(|(chunk_idx, labels)| {
            let base = slab_start + chunk_idx * chunk;
            let mut changes = 0u64;
            let mut error = 0f64;
            let mut dist = vec![0f64; col_clusters];
            for (k, label) in labels.iter_mut().enumerate() {
                let j = base + k;
                dist.fill(0.0);
                for (i, &r) in row_labels.iter().enumerate() {
                    let x = f64::from(matrix.at(i, j));
                    let avg_row = &averages[r as usize * col_clusters..][..col_clusters];
                    for (d, &a) in dist.iter_mut().zip(avg_row.iter()) {
                        let diff = f64::from(a) - x;
                        *d += diff * diff;
                    }
                }
                let current = *label;
                let (best, best_dist) = argmin_label(&dist, current);
                changes += u64::from(best != current);
                error += best_dist;
                *label = best;
            }
            (changes, error)
        })
        .collect();

    let mut out = SlabAssignment::default();
    for (changes, error) in partials {
        out.changes += changes;
        out.error += error;
    }
    out
}
