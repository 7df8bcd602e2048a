// crates/cocl-kernels/src/lib.rs

//! Data-parallel kernels for the co-clustering engine.
//!
//! Each kernel fans a disjoint index range out over the rayon pool, computes
//! per-chunk partials sequentially, and combines the partials on the calling
//! thread *in chunk order*. Floating-point results therefore depend only on
//! the chunk geometry, not on scheduling, so identical runs with an identical
//! world size are bitwise reproducible. All partial sums are accumulated in
//! `f64`; `f32` appears only in the stored matrix and block averages.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod assign;
pub mod blocks;

pub use assign::{assign_cols, assign_rows, SlabAssignment};
pub use blocks::accumulate_blocks;

/// Chunk length for fanning `total` items out over the pool, bounded below
/// so tiny inputs stay on few threads.
pub(crate) fn chunk_len(total: usize, min: usize) -> usize {
    let threads = rayon::current_num_threads().next_power_of_two();
    (total / threads).max(min)
}
