/// Default number of markers per pairwise comparison
///
/// Defined as `500 * (2/3)^log2(L)` for `L` labels, rounded to the nearest
/// integer. This steadily shrinks the markers per comparison as the number
/// of labels grows, to avoid an excessive number of features for references
/// with many labels. Zero labels give zero markers.
///
/// ### Params
///
/// * `num_labels` - Number of labels in the reference(s).
///
/// ### Returns
///
/// The number of markers to keep for each pairwise comparison.
pub fn default_number(num_labels: usize) -> usize {
    if num_labels == 0 {
        return 0;
    }
    let value = 500.0 * (2.0_f64 / 3.0).powf((num_labels as f64).log2());
    value.round() as usize
}

/// Resolve the number of markers to keep
///
/// ### Params
///
/// * `ngroups` - Number of labels.
/// * `request` - Explicitly requested number, if any.
///
/// ### Returns
///
/// `request` if set, otherwise `default_number(ngroups)`.
pub fn get_num_keep(ngroups: usize, request: Option<usize>) -> usize {
    request.unwrap_or_else(|| default_number(ngroups))
}
