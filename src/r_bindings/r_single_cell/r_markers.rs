use extendr_api::prelude::*;

use crate::single_cell::classic_markers::*;
use crate::utils::r_rust_interface::{
    markers_to_r_list, r_groups_to_usize, r_matrix_to_faer, usize_to_r_int,
};

/// Choose classic markers between the labels of a reference
///
/// @description
/// For every ordered pair of labels, genes are ranked by the difference of
/// the median expression in the first label over the second. The top genes
/// with a positive difference are kept as markers.
///
/// @param x Numeric matrix. The reference expression, genes x samples.
/// @param labels Integer. The label of every sample (0-indexed!).
/// @param params List. The parameters with the following elements:
/// \itemize{
///   \item number - Integer. Markers to keep per comparison. If missing, a
///   default is derived from the number of labels.
///   \item keep_ties - Boolean. Report all genes tied at the last position.
///   \item num_threads - Integer. Number of workers.
///   \item verbose - Boolean. Controls verbosity of the function.
/// }
///
/// @return A nested list in which element `[[g1]][[g2]]` is a list with
/// `rows` (0-indexed gene positions) and `scores` (median differences) of
/// the markers upregulated in label `g1` over label `g2`.
///
/// @export
#[extendr]
fn rs_classic_markers(x: RMatrix<f64>, labels: Vec<i32>, params: List) -> extendr_api::Result<List> {
    let mat = r_matrix_to_faer(&x);
    let labels = r_groups_to_usize("labels", &labels)?;
    let options = ChooseOptions::from_r_list(params);

    let markers = choose(&mat, &labels, &options).map_err(|e| Error::Other(e.to_string()))?;

    markers_to_r_list(markers)
}

/// Choose classic markers in a reference with multiple blocks
///
/// @description
/// Median differences are computed within each block and combined across
/// the blocks that contain both labels, either via the mean or the minimum.
///
/// @param x Numeric matrix. The reference expression, genes x samples.
/// @param labels Integer. The label of every sample (0-indexed!).
/// @param blocks Integer. The block of every sample (0-indexed!).
/// @param params List. Same elements as for `rs_classic_markers()` plus
/// \itemize{
///   \item use_minimum - Boolean. Use the minimum difference across blocks
///   instead of the mean.
/// }
///
/// @return A nested list structured like the one of `rs_classic_markers()`.
///
/// @export
#[extendr]
fn rs_classic_markers_blocked(
    x: RMatrix<f64>,
    labels: Vec<i32>,
    blocks: Vec<i32>,
    params: List,
) -> extendr_api::Result<List> {
    let mat = r_matrix_to_faer(&x);
    let labels = r_groups_to_usize("labels", &labels)?;
    let blocks = r_groups_to_usize("blocks", &blocks)?;
    let options = ChooseBlockedOptions::from_r_list(params);

    let markers = choose_blocked(&mat, &labels, &blocks, &options)
        .map_err(|e| Error::Other(e.to_string()))?;

    markers_to_r_list(markers)
}

/// Default number of markers per comparison
///
/// @param num_labels Integer. Number of labels in the reference.
///
/// @return The number of markers to keep for each pairwise comparison.
///
/// @export
#[extendr]
fn rs_default_markers(num_labels: usize) -> extendr_api::Result<i32> {
    usize_to_r_int("Default number of markers", default_number(num_labels))
}

extendr_module! {
    mod r_markers;
    fn rs_classic_markers;
    fn rs_classic_markers_blocked;
    fn rs_default_markers;
}
