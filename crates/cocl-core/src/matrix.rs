// crates/cocl-core/src/matrix.rs

//! Dense row-major `f32` matrix storage.
//!
//! The clustering engine treats the matrix as read-only shared state: every
//! worker rank reads the whole matrix, and only *work* is partitioned across
//! ranks. The matrix is therefore plain contiguous storage with cheap
//! row/cell accessors and no interior mutability.

use thiserror::Error;

/// Construction failures for [`DenseMatrix`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    /// Buffer length does not equal `num_rows * num_cols`.
    #[error("matrix shape {num_rows}x{num_cols} does not match buffer length {len}")]
    ShapeMismatch {
        /// Declared row count.
        num_rows: usize,
        /// Declared column count.
        num_cols: usize,
        /// Actual buffer length.
        len: usize,
    },
    /// Rows of a row-of-rows constructor have unequal lengths.
    #[error("row {row} has length {len}, expected {expected}")]
    RaggedRows {
        /// Index of the offending row.
        row: usize,
        /// Its length.
        len: usize,
        /// Length of the first row.
        expected: usize,
    },
}

/// Immutable-during-clustering dense matrix of 32-bit floats, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    data: Vec<f32>,
    num_rows: usize,
    num_cols: usize,
}

impl DenseMatrix {
    /// Wrap an existing row-major buffer.
    ///
    /// # Errors
    /// Returns [`MatrixError::ShapeMismatch`] if `data.len() != num_rows * num_cols`.
    pub fn from_vec(num_rows: usize, num_cols: usize, data: Vec<f32>) -> Result<Self, MatrixError> {
        if data.len() != num_rows * num_cols {
            return Err(MatrixError::ShapeMismatch {
                num_rows,
                num_cols,
                len: data.len(),
            });
        }
        Ok(Self {
            data,
            num_rows,
            num_cols,
        })
    }

    /// Build from a vector of equal-length rows (test and fixture helper).
    ///
    /// # Errors
    /// Returns [`MatrixError::RaggedRows`] if any row length differs from the first.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, MatrixError> {
        let num_rows = rows.len();
        let num_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(num_rows * num_cols);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != num_cols {
                return Err(MatrixError::RaggedRows {
                    row,
                    len: values.len(),
                    expected: num_cols,
                });
            }
            data.extend_from_slice(&values);
        }
        Ok(Self {
            data,
            num_rows,
            num_cols,
        })
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns.
    #[inline]
    #[must_use]
    pub const fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Total number of cells.
    #[inline]
    #[must_use]
    pub const fn num_cells(&self) -> usize {
        self.num_rows * self.num_cols
    }

    /// Whether the matrix has no cells.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.num_cells() == 0
    }

    /// Cell value at `(i, j)`.
    #[inline]
    #[must_use]
    pub fn at(&self, i: usize, j: usize) -> f32 {
        debug_assert!(i < self.num_rows && j < self.num_cols);
        self.data[i * self.num_cols + j]
    }

    /// Row `i` as a contiguous slice.
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.num_cols;
        &self.data[start..start + self.num_cols]
    }

    /// The whole row-major buffer.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}
