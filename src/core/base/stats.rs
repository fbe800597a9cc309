use std::cmp::Ordering;

////////////
// Groups //
////////////

/// Number of groups implied by a per-sample assignment
///
/// Group indices are assumed to be contiguous from zero, so this is simply
/// the largest value plus one. Unused indices in between are tolerated.
///
/// ### Params
///
/// * `assignment` - Group index per sample.
///
/// ### Returns
///
/// The number of groups (`0` for an empty assignment).
pub fn total_groups(assignment: &[usize]) -> usize {
    assignment.iter().max().map_or(0, |&m| m + 1)
}

/// Count the samples per group
///
/// ### Params
///
/// * `assignment` - Group index per sample.
///
/// ### Returns
///
/// Vector of length `total_groups(assignment)` with the group sizes.
pub fn tabulate_groups(assignment: &[usize]) -> Vec<usize> {
    let mut sizes = vec![0_usize; total_groups(assignment)];
    for &g in assignment {
        sizes[g] += 1;
    }
    sizes
}

////////////
// Median //
////////////

/// Pick the `n`-th smallest value of the logical vector `[neg, zeros, pos]`
///
/// `values` must have been three-way partitioned so that the first
/// `n_neg` entries are negative and the last `n_pos` are positive.
fn nth_with_zeros(values: &mut [f64], n_neg: usize, n_pos: usize, n_zero: usize, n: usize) -> f64 {
    if n < n_neg {
        let (_, nth, _) = values[..n_neg].select_nth_unstable_by(n, f64::total_cmp);
        *nth
    } else if n < n_neg + n_zero {
        0.0
    } else {
        let start = values.len() - n_pos;
        let (_, nth, _) =
            values[start..].select_nth_unstable_by(n - n_neg - n_zero, f64::total_cmp);
        *nth
    }
}

/// Median of a value buffer padded with implicit zeros
///
/// The buffer holds the observed values of one group; any entries missing
/// up to `logical_size` are zeros that were not stored (sparse rows). NaNs
/// are ignored and shrink the logical size. The buffer gets reordered.
///
/// ### Params
///
/// * `values` - The observed values. Will be modified in place.
/// * `logical_size` - Total number of samples in the group, including the
///   implicit zeros. Must be `>= values.len()`.
///
/// ### Returns
///
/// The median, or `NaN` if no non-missing value remains.
pub fn median_with_zeros(values: &mut Vec<f64>, logical_size: usize) -> f64 {
    debug_assert!(
        values.len() <= logical_size,
        "More stored values ({}) than samples in the group ({})",
        values.len(),
        logical_size
    );
    let stored = values.len();
    values.retain(|x| !x.is_nan());
    let logical_size = logical_size - (stored - values.len());

    if logical_size == 0 {
        return f64::NAN;
    }

    // three-way partition: negatives | zeros | positives
    let mut lo = 0;
    let mut mid = 0;
    let mut hi = values.len();
    while mid < hi {
        match values[mid].partial_cmp(&0.0) {
            Some(Ordering::Less) => {
                values.swap(lo, mid);
                lo += 1;
                mid += 1;
            }
            Some(Ordering::Greater) => {
                hi -= 1;
                values.swap(mid, hi);
            }
            _ => mid += 1,
        }
    }

    let n_neg = lo;
    let n_pos = values.len() - hi;
    let n_zero = logical_size - n_neg - n_pos;

    let half = logical_size / 2;
    if logical_size % 2 == 1 {
        nth_with_zeros(values, n_neg, n_pos, n_zero, half)
    } else {
        let left = nth_with_zeros(values, n_neg, n_pos, n_zero, half - 1);
        let right = nth_with_zeros(values, n_neg, n_pos, n_zero, half);
        (left + right) / 2.0
    }
}
