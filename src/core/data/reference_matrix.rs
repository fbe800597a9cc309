//! Row-wise access to reference expression matrices (genes x samples).

use faer::{Mat, MatRef};

use crate::core::data::sparse_structures::{CompressedSparseData, CompressedSparseFormat};
use crate::utils::errors::{MarkerError, Result};

////////////
// Traits //
////////////

/// A genes x samples matrix that can be streamed row by row
///
/// Implementors are shared read-only across the scanning workers, hence the
/// `Sync` bound. `is_sparse()` tells the scanner which of the two fetch
/// methods is the cheap one; both must describe the same values.
pub trait ReferenceMatrix: Sync {
    /// Number of rows (genes).
    fn nrows(&self) -> usize;

    /// Number of columns (samples).
    fn ncols(&self) -> usize;

    /// Whether the storage is sparse, i.e., `fetch_sparse_row()` should be
    /// preferred.
    fn is_sparse(&self) -> bool;

    /// Write all values of `row` into `buffer` (length `ncols()`).
    fn fetch_dense_row(&self, row: usize, buffer: &mut [f64]);

    /// Replace the contents of `values` and `indices` with the stored
    /// (structurally non-zero) entries of `row` and their column indices.
    fn fetch_sparse_row(&self, row: usize, values: &mut Vec<f64>, indices: &mut Vec<usize>);
}

///////////
// Dense //
///////////

impl ReferenceMatrix for MatRef<'_, f64> {
    fn nrows(&self) -> usize {
        MatRef::nrows(self)
    }

    fn ncols(&self) -> usize {
        MatRef::ncols(self)
    }

    fn is_sparse(&self) -> bool {
        false
    }

    fn fetch_dense_row(&self, row: usize, buffer: &mut [f64]) {
        for (col, out) in buffer.iter_mut().enumerate() {
            *out = self[(row, col)];
        }
    }

    fn fetch_sparse_row(&self, row: usize, values: &mut Vec<f64>, indices: &mut Vec<usize>) {
        values.clear();
        indices.clear();
        for col in 0..MatRef::ncols(self) {
            let val = self[(row, col)];
            if val != 0.0 {
                values.push(val);
                indices.push(col);
            }
        }
    }
}

impl ReferenceMatrix for Mat<f64> {
    fn nrows(&self) -> usize {
        Mat::nrows(self)
    }

    fn ncols(&self) -> usize {
        Mat::ncols(self)
    }

    fn is_sparse(&self) -> bool {
        false
    }

    fn fetch_dense_row(&self, row: usize, buffer: &mut [f64]) {
        self.as_ref().fetch_dense_row(row, buffer)
    }

    fn fetch_sparse_row(&self, row: usize, values: &mut Vec<f64>, indices: &mut Vec<usize>) {
        self.as_ref().fetch_sparse_row(row, values, indices)
    }
}

////////////
// Sparse //
////////////

/// Sparse reference matrix
///
/// Column-compressed input is converted once into row-compressed storage so
/// that each row can be handed out as two contiguous slices.
///
/// ### Fields
///
/// * `csr` - The row-compressed data.
#[derive(Debug, Clone)]
pub struct SparseReference {
    csr: CompressedSparseData<f64>,
}

impl SparseReference {
    /// Generate a sparse reference from any compressed sparse data
    ///
    /// ### Params
    ///
    /// * `sparse` - CSC or CSR data; CSC gets converted.
    ///
    /// ### Returns
    ///
    /// The `SparseReference`, or an error if the pointers or indices do not
    /// fit the shape, or an entry is stored more than once.
    pub fn new(sparse: CompressedSparseData<f64>) -> Result<Self> {
        let (nrow, ncol) = sparse.shape();
        let expected_ptr = match sparse.cs_type {
            CompressedSparseFormat::Csc => ncol + 1,
            CompressedSparseFormat::Csr => nrow + 1,
        };
        if sparse.indptr.len() != expected_ptr {
            return Err(MarkerError::LengthMismatch {
                what: "index pointers",
                expected: expected_ptr,
                actual: sparse.indptr.len(),
            });
        }
        if sparse.indices.len() != sparse.data.len() {
            return Err(MarkerError::LengthMismatch {
                what: "sparse indices",
                expected: sparse.data.len(),
                actual: sparse.indices.len(),
            });
        }

        let n_inner = match sparse.cs_type {
            CompressedSparseFormat::Csc => nrow,
            CompressedSparseFormat::Csr => ncol,
        };
        if sparse.indices.iter().any(|&i| i >= n_inner) {
            return Err(MarkerError::InvalidParameter(format!(
                "Sparse indices must be smaller than {}",
                n_inner
            )));
        }
        let pointers_valid = sparse.indptr.first() == Some(&0)
            && sparse.indptr.last() == Some(&sparse.data.len())
            && sparse.indptr.windows(2).all(|w| w[0] <= w[1]);
        if !pointers_valid {
            return Err(MarkerError::InvalidParameter(
                "Index pointers must be non-decreasing from 0 to the number of values".to_string(),
            ));
        }

        // last compressed slice in which each inner index was seen
        let mut last_seen = vec![usize::MAX; n_inner];
        for outer in 0..expected_ptr - 1 {
            for &inner in &sparse.indices[sparse.indptr[outer]..sparse.indptr[outer + 1]] {
                if last_seen[inner] == outer {
                    return Err(MarkerError::InvalidParameter(format!(
                        "Duplicated entry at inner index {} of compressed slice {}",
                        inner, outer
                    )));
                }
                last_seen[inner] = outer;
            }
        }

        let csr = match sparse.cs_type {
            CompressedSparseFormat::Csr => sparse,
            CompressedSparseFormat::Csc => sparse.transform(),
        };

        Ok(Self { csr })
    }

    /// Generate a sparse reference from CSC vectors
    ///
    /// ### Params
    ///
    /// * `data` - The non-zero values.
    /// * `row_indices` - Row index of each value.
    /// * `col_ptrs` - Column pointers (length `ncol + 1`).
    /// * `shape` - Tuple of `(nrow, ncol)`.
    pub fn from_csc(
        data: &[f64],
        row_indices: &[usize],
        col_ptrs: &[usize],
        shape: (usize, usize),
    ) -> Result<Self> {
        Self::new(CompressedSparseData::new_csc(data, row_indices, col_ptrs, shape))
    }

    /// Compress a dense matrix
    ///
    /// ### Params
    ///
    /// * `dense` - The dense genes x samples matrix.
    pub fn from_dense(dense: MatRef<f64>) -> Self {
        Self {
            csr: CompressedSparseData::from_dense_csc(dense).transform(),
        }
    }

    /// Number of stored values
    pub fn nnz(&self) -> usize {
        self.csr.get_nnz()
    }

    fn row_range(&self, row: usize) -> std::ops::Range<usize> {
        self.csr.indptr[row]..self.csr.indptr[row + 1]
    }
}

impl ReferenceMatrix for SparseReference {
    fn nrows(&self) -> usize {
        self.csr.shape().0
    }

    fn ncols(&self) -> usize {
        self.csr.shape().1
    }

    fn is_sparse(&self) -> bool {
        true
    }

    fn fetch_dense_row(&self, row: usize, buffer: &mut [f64]) {
        buffer.fill(0.0);
        let range = self.row_range(row);
        for (&col, &val) in self.csr.indices[range.clone()]
            .iter()
            .zip(&self.csr.data[range])
        {
            buffer[col] = val;
        }
    }

    fn fetch_sparse_row(&self, row: usize, values: &mut Vec<f64>, indices: &mut Vec<usize>) {
        let range = self.row_range(row);
        values.clear();
        values.extend_from_slice(&self.csr.data[range.clone()]);
        indices.clear();
        indices.extend_from_slice(&self.csr.indices[range]);
    }
}
