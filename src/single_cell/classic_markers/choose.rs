//! Classic marker selection between labels of a reference.

#[cfg(feature = "r")]
use extendr_api::List;
use log::{debug, info};
use std::time::Instant;

use crate::core::base::stats::tabulate_groups;
use crate::core::data::reference_matrix::ReferenceMatrix;
use crate::single_cell::classic_markers::number::get_num_keep;
use crate::single_cell::classic_markers::scan::scan_matrix;
use crate::single_cell::classic_markers::top_queue::*;
use crate::utils::errors::{MarkerError, Result};

////////////
// Params //
////////////

/// Options for `choose()`
///
/// ### Fields
///
/// * `number` - Number of top genes to keep as markers in each pairwise
///   comparison. If `None`, derived from the number of labels via
///   `default_number()`.
/// * `keep_ties` - Whether to report all genes tied at the `number`-th
///   position. Otherwise at most `number` genes are reported, with ties
///   going to the earlier row.
/// * `num_threads` - Number of workers for the row scan.
/// * `verbose` - Controls verbosity of the function.
#[derive(Clone, Debug)]
pub struct ChooseOptions {
    pub number: Option<usize>,
    pub keep_ties: bool,
    pub num_threads: usize,
    pub verbose: bool,
}

impl Default for ChooseOptions {
    fn default() -> Self {
        Self {
            number: None,
            keep_ties: false,
            num_threads: 1,
            verbose: false,
        }
    }
}

#[cfg(feature = "r")]
impl ChooseOptions {
    /// Generate the options from an R list
    ///
    /// Missing or negative `number` falls back to the default budget.
    ///
    /// ### Params
    ///
    /// * `r_list` - The named R list with the parameters.
    ///
    /// ### Returns
    ///
    /// The `ChooseOptions`.
    pub fn from_r_list(r_list: List) -> Self {
        let params = r_list.into_hashmap();

        let number = params
            .get("number")
            .and_then(|v| v.as_integer())
            .and_then(|x| usize::try_from(x).ok());
        let keep_ties = params
            .get("keep_ties")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let num_threads = params
            .get("num_threads")
            .and_then(|v| v.as_integer())
            .unwrap_or(1)
            .max(0) as usize;
        let verbose = params
            .get("verbose")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Self {
            number,
            keep_ties,
            num_threads,
            verbose,
        }
    }
}

/// Check the per-sample assignment and the thread count
///
/// ### Params
///
/// * `what` - Name of the assignment for the error message.
/// * `assignment` - The per-sample assignment.
/// * `ncol` - Number of columns in the matrix.
/// * `num_threads` - Requested workers.
pub(crate) fn validate_inputs(
    what: &'static str,
    assignment: &[usize],
    ncol: usize,
    num_threads: usize,
) -> Result<()> {
    if assignment.len() != ncol {
        return Err(MarkerError::LengthMismatch {
            what,
            expected: ncol,
            actual: assignment.len(),
        });
    }
    if num_threads == 0 {
        return Err(MarkerError::InvalidParameter(
            "num_threads must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/////////////
// Helpers //
/////////////

/// Shared implementation of `choose()` and `choose_index()`
fn choose_raw<M, T>(matrix: &M, labels: &[usize], options: &ChooseOptions) -> Result<Markers<T>>
where
    M: ReferenceMatrix + ?Sized,
    T: MarkerOutput,
{
    let ncol = matrix.ncols();
    let nrow = matrix.nrows();
    validate_inputs("labels", labels, ncol, options.num_threads)?;

    let group_sizes = tabulate_groups(labels);
    let ngroups = group_sizes.len();
    let num_keep = get_num_keep(ngroups, options.number);
    debug!(
        "Choosing up to {} markers for {} labels over {} genes",
        num_keep, ngroups, nrow
    );

    if num_keep == 0 || nrow == 0 || ncol == 0 {
        return Ok(report_empty_markers(ngroups));
    }

    let start_scan = Instant::now();
    let template = allocate_pairwise_queues(num_keep, ngroups, options.keep_ties, true)?;

    let pqueues = scan_matrix(
        matrix,
        labels,
        &group_sizes,
        || template.clone(),
        |r, medians: &[f64], queues: &mut PairwiseTopQueues| {
            for g1 in 1..ngroups {
                for g2 in 0..g1 {
                    let delta = medians[g1] - medians[g2];
                    queues[g1][g2].push(delta, r);
                    queues[g2][g1].push(-delta, r);
                }
            }
        },
        options.num_threads,
    )?;

    if options.verbose {
        info!("Computed pairwise median differences: {:.2?}", start_scan.elapsed());
    }

    Ok(report_best_top_queues(pqueues, ngroups))
}

////////////////////
// Main functions //
////////////////////

/// Choose markers with the classic reference-based annotation approach
///
/// Computes the median of every gene within each label. For the comparison
/// of label `A` against `B`, the markers are the genes with the largest
/// positive difference of `A`'s median over `B`'s. If the matrix contains
/// log-expression values, this is a log-fold change.
///
/// ### Params
///
/// * `matrix` - Genes x samples reference matrix.
/// * `labels` - Label of every sample (column); values in `[0, L)`.
/// * `options` - The `ChooseOptions`.
///
/// ### Returns
///
/// `markers[i][j]` contains the top markers of label `i` over label `j` as
/// `(row, difference)`, sorted by decreasing difference and then by row.
/// All differences are strictly positive; `markers[i][i]` is empty.
pub fn choose<M>(
    matrix: &M,
    labels: &[usize],
    options: &ChooseOptions,
) -> Result<Markers<(usize, f64)>>
where
    M: ReferenceMatrix + ?Sized,
{
    choose_raw(matrix, labels, options)
}

/// Variant of `choose()` that only reports row indices
///
/// ### Params
///
/// * `matrix` - Genes x samples reference matrix.
/// * `labels` - Label of every sample (column); values in `[0, L)`.
/// * `options` - The `ChooseOptions`.
///
/// ### Returns
///
/// Same as `choose()` with the differences dropped.
pub fn choose_index<M>(matrix: &M, labels: &[usize], options: &ChooseOptions) -> Result<Markers<usize>>
where
    M: ReferenceMatrix + ?Sized,
{
    choose_raw(matrix, labels, options)
}
