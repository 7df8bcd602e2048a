// crates/cocl-engine/src/lib.rs

//! SPMD co-clustering engine.
//!
//! [`cluster`] simultaneously partitions the rows and columns of a dense
//! `f32` matrix into R×C groups minimizing total squared error against the
//! block-average reconstruction. Each iteration recomputes the R×C block
//! means, reassigns every row to its best row label, then reassigns every
//! column; the loop ends when an iteration changes no label or the iteration
//! cap is reached.
//!
//! Work is partitioned SPMD-style across worker ranks (threads): rows and
//! columns are striped into contiguous slabs, each rank reassigns only its
//! slab, and label vectors are re-replicated through the collective layer
//! after every phase. Inside a rank the kernels fan out over the rayon pool.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

mod averages;
mod controller;
pub mod error;
pub mod opts;
mod phases;
mod spmd;
pub mod stats;

pub use error::EngineError;
pub use opts::ClusterOpts;
pub use spmd::cluster;
pub use stats::{ClusterStats, IterationStats};

// Convenience re-export so callers don't need a direct cocl-core dependency
// for the common path.
pub use cocl_core::DenseMatrix;
