// crates/cocl-core/src/labels.rs

//! Label-vector validation helpers.
//!
//! Row and column labels are plain `Vec<u32>`s; the engine keeps one
//! replicated copy per worker rank and re-synchronizes them after every
//! phase. The helpers here enforce the two label invariants at the API
//! boundary: length matches the matrix shape, and every value lies in
//! `[0, bound)`.

use std::fmt;

use thiserror::Error;

/// Which label vector a validation error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelAxis {
    /// Row labels (length = matrix rows, values in `[0, R)`).
    Rows,
    /// Column labels (length = matrix columns, values in `[0, C)`).
    Columns,
}

impl fmt::Display for LabelAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows => write!(f, "row"),
            Self::Columns => write!(f, "column"),
        }
    }
}

/// Label-vector validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    /// Vector length does not match the matrix dimension.
    #[error("{axis} label vector has length {got}, expected {want}")]
    LengthMismatch {
        /// Offending axis.
        axis: LabelAxis,
        /// Actual vector length.
        got: usize,
        /// Expected length.
        want: usize,
    },
    /// A label value is outside `[0, bound)`.
    #[error("{axis} label {value} at index {index} is outside [0, {bound})")]
    OutOfRange {
        /// Offending axis.
        axis: LabelAxis,
        /// Position of the bad label.
        index: usize,
        /// The bad value.
        value: u32,
        /// Exclusive upper bound (cluster count).
        bound: u32,
    },
}

/// Check a label vector against its expected length and cluster bound.
///
/// # Errors
/// Returns the first violated invariant (length first, then range).
pub fn validate_labels(
    axis: LabelAxis,
    labels: &[u32],
    want_len: usize,
    bound: u32,
) -> Result<(), LabelError> {
    if labels.len() != want_len {
        return Err(LabelError::LengthMismatch {
            axis,
            got: labels.len(),
            want: want_len,
        });
    }
    for (index, &value) in labels.iter().enumerate() {
        if value >= bound {
            return Err(LabelError::OutOfRange {
                axis,
                index,
                value,
                bound,
            });
        }
    }
    Ok(())
}
