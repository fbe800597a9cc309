//! Single pass over the reference matrix yielding per-combination medians.

use log::debug;
use rayon::prelude::*;

use crate::core::base::stats::median_with_zeros;
use crate::core::data::reference_matrix::ReferenceMatrix;
use crate::utils::errors::{MarkerError, Result};
use crate::utils::general::partition_spans;

/////////////
// Helpers //
/////////////

/// Process one contiguous span of rows
///
/// ### Params
///
/// * `matrix` - The reference matrix.
/// * `combo` - Combination index per column.
/// * `combo_sizes` - Number of columns per combination.
/// * `setup` - Creates the worker-local state.
/// * `fun` - Called with the row index, the medians and the state.
/// * `span` - Tuple of `(start, length)` of the rows to process.
///
/// ### Returns
///
/// The worker-local state after all rows of the span were processed.
fn scan_span<M, W, S, F>(
    matrix: &M,
    combo: &[usize],
    combo_sizes: &[usize],
    setup: &S,
    fun: &F,
    span: (usize, usize),
) -> W
where
    M: ReferenceMatrix + ?Sized,
    S: Fn() -> W,
    F: Fn(usize, &[f64], &mut W),
{
    let (start, length) = span;
    let ncombos = combo_sizes.len();
    let mut state = setup();

    let mut medians = vec![f64::NAN; ncombos];
    let mut workspace: Vec<Vec<f64>> = combo_sizes
        .iter()
        .map(|&size| Vec::with_capacity(size))
        .collect();

    if matrix.is_sparse() {
        let mut values: Vec<f64> = Vec::new();
        let mut indices: Vec<usize> = Vec::new();

        for r in start..start + length {
            matrix.fetch_sparse_row(r, &mut values, &mut indices);
            for (&val, &col) in values.iter().zip(indices.iter()) {
                workspace[combo[col]].push(val);
            }

            // implicit zeros are accounted for via the full combination size
            for (c, w) in workspace.iter_mut().enumerate() {
                medians[c] = median_with_zeros(w, combo_sizes[c]);
                w.clear();
            }

            fun(r, &medians, &mut state);
        }
    } else {
        let mut buffer = vec![0.0_f64; matrix.ncols()];

        for r in start..start + length {
            matrix.fetch_dense_row(r, &mut buffer);
            for (&val, &c) in buffer.iter().zip(combo.iter()) {
                workspace[c].push(val);
            }

            for (c, w) in workspace.iter_mut().enumerate() {
                let size = w.len();
                medians[c] = median_with_zeros(w, size);
                w.clear();
            }

            fun(r, &medians, &mut state);
        }
    }

    state
}

////////////////////
// Main functions //
////////////////////

/// Stream all rows and compute the median of every combination
///
/// Rows are split into contiguous spans, one per worker. Each worker calls
/// `setup` once to create its private state, then invokes `fun` for every
/// row of its span with the per-combination medians (NaN for combinations
/// without any non-missing value). No state is shared between workers.
///
/// ### Params
///
/// * `matrix` - The genes x samples reference matrix.
/// * `combo` - Combination index (in `[0, combo_sizes.len())`) of every
///   column.
/// * `combo_sizes` - Number of columns per combination. Its length defines
///   the number of combinations.
/// * `setup` - Creates the worker-local state.
/// * `fun` - Per-row callback: `(row, medians, state)`.
/// * `num_threads` - Number of workers. `1` processes everything inline.
///
/// ### Returns
///
/// The final worker states, in ascending order of their row spans.
pub fn scan_matrix<M, W, S, F>(
    matrix: &M,
    combo: &[usize],
    combo_sizes: &[usize],
    setup: S,
    fun: F,
    num_threads: usize,
) -> Result<Vec<W>>
where
    M: ReferenceMatrix + ?Sized,
    W: Send,
    S: Fn() -> W + Sync,
    F: Fn(usize, &[f64], &mut W) + Sync,
{
    if num_threads == 0 {
        return Err(MarkerError::InvalidParameter(
            "num_threads must be at least 1".to_string(),
        ));
    }
    if combo.len() != matrix.ncols() {
        return Err(MarkerError::LengthMismatch {
            what: "combination indices",
            expected: matrix.ncols(),
            actual: combo.len(),
        });
    }

    let spans = partition_spans(matrix.nrows(), num_threads);
    debug!(
        "Scanning {} rows over {} combinations with {} worker(s)",
        matrix.nrows(),
        combo_sizes.len(),
        spans.len()
    );

    if spans.len() <= 1 {
        return Ok(spans
            .into_iter()
            .map(|span| scan_span(matrix, combo, combo_sizes, &setup, &fun, span))
            .collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(spans.len())
        .build()?;

    Ok(pool.install(|| {
        spans
            .into_par_iter()
            .map(|span| scan_span(matrix, combo, combo_sizes, &setup, &fun, span))
            .collect()
    }))
}
