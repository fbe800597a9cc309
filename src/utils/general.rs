use faer::{Mat, MatRef};

use crate::assert_nrows;
use crate::utils::errors::{MarkerError, Result};

/////////////////////
// SIZE ARITHMETIC //
/////////////////////

/// Multiply two sizes, failing on overflow
///
/// ### Params
///
/// * `context` - What is being sized; reported in the error.
/// * `left` - First factor.
/// * `right` - Second factor.
///
/// ### Returns
///
/// The product or `MarkerError::SizeOverflow`.
pub fn checked_product(context: &'static str, left: usize, right: usize) -> Result<usize> {
    left.checked_mul(right).ok_or(MarkerError::SizeOverflow {
        context,
        left,
        right,
    })
}

/// Linearise a two-dimensional index
///
/// `fast` is the fast-changing dimension with `fast_extent` entries. Callers
/// need to have validated `fast_extent * slow_extent` via `checked_product`
/// beforehand, after which this cannot overflow.
///
/// ### Params
///
/// * `fast` - Index along the fast-changing dimension.
/// * `fast_extent` - Size of the fast-changing dimension.
/// * `slow` - Index along the slow-changing dimension.
///
/// ### Returns
///
/// The linear offset `slow * fast_extent + fast`.
#[inline(always)]
pub fn nd_offset(fast: usize, fast_extent: usize, slow: usize) -> usize {
    slow * fast_extent + fast
}

/// Split `total` items into contiguous spans for a fixed number of workers
///
/// Every worker but the last gets `ceil(total / num_workers)` items; workers
/// that would get nothing are omitted.
///
/// ### Params
///
/// * `total` - Number of items to distribute.
/// * `num_workers` - Maximum number of workers (at least 1).
///
/// ### Returns
///
/// Vector of `(start, length)` spans in ascending order.
pub fn partition_spans(total: usize, num_workers: usize) -> Vec<(usize, usize)> {
    if total == 0 {
        return Vec::new();
    }
    let num_workers = num_workers.max(1);
    let job_size = total.div_ceil(num_workers);

    (0..total)
        .step_by(job_size)
        .map(|start| (start, job_size.min(total - start)))
        .collect()
}

//////////////////
// MATRIX STUFF //
//////////////////

/// Column bind matrices
///
/// The function will panic if the number of rows of the matrices differ.
///
/// ### Params
///
/// * `matrices` - Slice of faer matrices to column bind
///
/// ### Returns
///
/// One column bound matrix from the initial matrices
pub fn colbind_matrices(matrices: &[Mat<f64>]) -> Mat<f64> {
    let nrows = matrices.first().map(|m| m.nrows()).unwrap_or(0);
    for matrix in matrices.iter().skip(1) {
        assert_nrows!(matrices[0], matrix);
    }

    // (matrix index, column within matrix) for every output column
    let col_source: Vec<(usize, usize)> = matrices
        .iter()
        .enumerate()
        .flat_map(|(m, matrix)| (0..matrix.ncols()).map(move |j| (m, j)))
        .collect();

    Mat::from_fn(nrows, col_source.len(), |i, j| {
        let (m, col) = col_source[j];
        matrices[m][(i, col)]
    })
}

/// Select a subset of columns into an owned matrix
///
/// Panics if any of the column indices is out of bounds.
///
/// ### Params
///
/// * `mat` - The original matrix.
/// * `col_indices` - The columns to keep, in the desired order.
///
/// ### Returns
///
/// Owned matrix with `mat.nrows()` rows and `col_indices.len()` columns.
pub fn subset_columns(mat: MatRef<f64>, col_indices: &[usize]) -> Mat<f64> {
    let max_col_index = col_indices.iter().max().copied().unwrap_or(0);
    assert!(
        col_indices.is_empty() || max_col_index < mat.ncols(),
        "You selected indices larger than ncol."
    );

    Mat::from_fn(mat.nrows(), col_indices.len(), |i, j| {
        mat[(i, col_indices[j])]
    })
}
