//! Classic marker selection for references with multiple blocks (batches).

#[cfg(feature = "r")]
use extendr_api::List;
use log::{debug, info};
use std::time::Instant;

use crate::core::base::stats::{tabulate_groups, total_groups};
use crate::core::data::reference_matrix::ReferenceMatrix;
#[cfg(feature = "r")]
use crate::single_cell::classic_markers::choose::ChooseOptions;
use crate::single_cell::classic_markers::choose::validate_inputs;
use crate::single_cell::classic_markers::number::get_num_keep;
use crate::single_cell::classic_markers::scan::scan_matrix;
use crate::single_cell::classic_markers::top_queue::*;
use crate::utils::errors::Result;
use crate::utils::general::{checked_product, nd_offset};

////////////
// Params //
////////////

/// Options for `choose_blocked()`
///
/// ### Fields
///
/// * `number` - Number of top genes to keep as markers in each pairwise
///   comparison. If `None`, derived from the number of labels via
///   `default_number()`.
/// * `keep_ties` - Whether to report all genes tied at the `number`-th
///   position.
/// * `use_minimum` - Report the minimum difference across blocks instead of
///   the mean. Focuses on genes that are consistently higher in every block.
/// * `num_threads` - Number of workers for the row scan.
/// * `verbose` - Controls verbosity of the function.
#[derive(Clone, Debug)]
pub struct ChooseBlockedOptions {
    pub number: Option<usize>,
    pub keep_ties: bool,
    pub use_minimum: bool,
    pub num_threads: usize,
    pub verbose: bool,
}

impl Default for ChooseBlockedOptions {
    fn default() -> Self {
        Self {
            number: None,
            keep_ties: false,
            use_minimum: false,
            num_threads: 1,
            verbose: false,
        }
    }
}

#[cfg(feature = "r")]
impl ChooseBlockedOptions {
    /// Generate the options from an R list
    ///
    /// ### Params
    ///
    /// * `r_list` - The named R list with the parameters. Shares the keys of
    ///   `ChooseOptions::from_r_list()` plus `use_minimum`.
    ///
    /// ### Returns
    ///
    /// The `ChooseBlockedOptions`.
    pub fn from_r_list(r_list: List) -> Self {
        let base = ChooseOptions::from_r_list(r_list.clone());
        let params = r_list.into_hashmap();

        let use_minimum = params
            .get("use_minimum")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Self {
            number: base.number,
            keep_ties: base.keep_ties,
            use_minimum,
            num_threads: base.num_threads,
            verbose: base.verbose,
        }
    }
}

/////////////
// Helpers //
/////////////

/// Mean of the per-block differences of `g1` over `g2`
///
/// Blocks in which either label has a NaN median are skipped.
///
/// ### Params
///
/// * `medians` - Medians per combination (`block * ngroups + label`).
/// * `g1` - First label.
/// * `g2` - Second label.
/// * `ngroups` - Number of labels.
/// * `nblocks` - Number of blocks.
///
/// ### Returns
///
/// The mean difference, or `None` if no block has both labels.
pub fn mean_block_delta(
    medians: &[f64],
    g1: usize,
    g2: usize,
    ngroups: usize,
    nblocks: usize,
) -> Option<f64> {
    let mut total = 0.0;
    let mut denom = 0_usize;
    for b in 0..nblocks {
        let delta = medians[nd_offset(g1, ngroups, b)] - medians[nd_offset(g2, ngroups, b)];
        if !delta.is_nan() {
            total += delta;
            denom += 1;
        }
    }

    (denom > 0).then(|| total / denom as f64)
}

/// Minimum per-block differences in both directions
///
/// Each direction takes its own minimum: the score of `g2` over `g1` is the
/// minimum of the negated differences, not the negated minimum. A gene only
/// scores well if it is higher in every block.
///
/// ### Params
///
/// * `medians` - Medians per combination (`block * ngroups + label`).
/// * `g1` - First label.
/// * `g2` - Second label.
/// * `ngroups` - Number of labels.
/// * `nblocks` - Number of blocks.
///
/// ### Returns
///
/// Tuple of `(g1 over g2, g2 over g1)`, or `None` if no block has both
/// labels or the minimum is not finite.
pub fn minimum_block_delta(
    medians: &[f64],
    g1: usize,
    g2: usize,
    ngroups: usize,
    nblocks: usize,
) -> Option<(f64, f64)> {
    let mut forward = f64::INFINITY;
    let mut reverse = f64::INFINITY;
    for b in 0..nblocks {
        let delta = medians[nd_offset(g1, ngroups, b)] - medians[nd_offset(g2, ngroups, b)];
        if !delta.is_nan() {
            forward = forward.min(delta);
            reverse = reverse.min(-delta);
        }
    }

    forward.is_finite().then_some((forward, reverse))
}

/// Shared implementation of `choose_blocked()` and `choose_blocked_index()`
fn choose_blocked_raw<M, T>(
    matrix: &M,
    labels: &[usize],
    blocks: &[usize],
    options: &ChooseBlockedOptions,
) -> Result<Markers<T>>
where
    M: ReferenceMatrix + ?Sized,
    T: MarkerOutput,
{
    let ncol = matrix.ncols();
    let nrow = matrix.nrows();
    validate_inputs("labels", labels, ncol, options.num_threads)?;
    validate_inputs("blocks", blocks, ncol, options.num_threads)?;

    let ngroups = total_groups(labels);
    let nblocks = total_groups(blocks);
    let num_keep = get_num_keep(ngroups, options.number);

    if num_keep == 0 || nrow == 0 || ncol == 0 {
        return Ok(report_empty_markers(ngroups));
    }

    // label is the faster changing dimension
    let ncombos = checked_product("label-block combinations", ngroups, nblocks)?;
    let combinations: Vec<usize> = labels
        .iter()
        .zip(blocks.iter())
        .map(|(&l, &b)| nd_offset(l, ngroups, b))
        .collect();
    let mut combo_sizes = tabulate_groups(&combinations);
    combo_sizes.resize(ncombos, 0);

    debug!(
        "Choosing up to {} markers for {} labels in {} blocks ({} combinations)",
        num_keep, ngroups, nblocks, ncombos
    );

    let start_scan = Instant::now();
    let template = allocate_pairwise_queues(num_keep, ngroups, options.keep_ties, true)?;
    let use_minimum = options.use_minimum;

    let pqueues = scan_matrix(
        matrix,
        &combinations,
        &combo_sizes,
        || template.clone(),
        |r, medians: &[f64], queues: &mut PairwiseTopQueues| {
            for g1 in 1..ngroups {
                for g2 in 0..g1 {
                    if use_minimum {
                        if let Some((forward, reverse)) =
                            minimum_block_delta(medians, g1, g2, ngroups, nblocks)
                        {
                            queues[g1][g2].push(forward, r);
                            queues[g2][g1].push(reverse, r);
                        }
                    } else if let Some(val) = mean_block_delta(medians, g1, g2, ngroups, nblocks)
                    {
                        queues[g1][g2].push(val, r);
                        queues[g2][g1].push(-val, r);
                    }
                }
            }
        },
        options.num_threads,
    )?;

    if options.verbose {
        info!(
            "Computed blocked median differences ({}): {:.2?}",
            if use_minimum { "minimum" } else { "mean" },
            start_scan.elapsed()
        );
    }

    Ok(report_best_top_queues(pqueues, ngroups))
}

////////////////////
// Main functions //
////////////////////

/// Choose markers in a reference with multiple blocks
///
/// Variant of `choose()` for references with batch effects. Differences
/// between label medians are computed within each block and combined into
/// a single statistic per gene and comparison: by default the mean across
/// the blocks containing both labels, or the minimum for more stringency.
///
/// ### Params
///
/// * `matrix` - Genes x samples reference matrix.
/// * `labels` - Label of every sample (column); values in `[0, L)`.
/// * `blocks` - Block of every sample (column); values in `[0, B)`.
/// * `options` - The `ChooseBlockedOptions`.
///
/// ### Returns
///
/// Markers structured like the output of `choose()`, reporting the combined
/// difference for each marker.
pub fn choose_blocked<M>(
    matrix: &M,
    labels: &[usize],
    blocks: &[usize],
    options: &ChooseBlockedOptions,
) -> Result<Markers<(usize, f64)>>
where
    M: ReferenceMatrix + ?Sized,
{
    choose_blocked_raw(matrix, labels, blocks, options)
}

/// Variant of `choose_blocked()` that only reports row indices
///
/// ### Params
///
/// * `matrix` - Genes x samples reference matrix.
/// * `labels` - Label of every sample (column); values in `[0, L)`.
/// * `blocks` - Block of every sample (column); values in `[0, B)`.
/// * `options` - The `ChooseBlockedOptions`.
///
/// ### Returns
///
/// Same as `choose_blocked()` with the differences dropped.
pub fn choose_blocked_index<M>(
    matrix: &M,
    labels: &[usize],
    blocks: &[usize],
    options: &ChooseBlockedOptions,
) -> Result<Markers<usize>>
where
    M: ReferenceMatrix + ?Sized,
{
    choose_blocked_raw(matrix, labels, blocks, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::reference_matrix::SparseReference;
    use crate::core::data::synthetic_data::{generate_expression, generate_labels};
    use crate::single_cell::classic_markers::choose::tests::{
        grouped_medians, pick_top, strip_to_indices,
    };
    use crate::single_cell::classic_markers::choose::{choose, ChooseOptions};
    use crate::assert_marker_layout;
    use crate::utils::errors::MarkerError;
    use crate::utils::general::{colbind_matrices, subset_columns};
    use faer::mat;

    const REQUESTED: [usize; 4] = [1, 20, 50, 1000];

    fn blocked_with(number: usize, use_minimum: bool) -> ChooseBlockedOptions {
        ChooseBlockedOptions {
            number: Some(number),
            use_minimum,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_block_matches_choose() {
        for requested in REQUESTED {
            let seed = 1234 * requested as u64;
            let mat = generate_expression(500, 50, 0.3, seed);
            let labels = generate_labels(50, 5, seed + 1);
            let blocks = vec![0_usize; 50];

            let simple = choose(
                &mat,
                &labels,
                &ChooseOptions {
                    number: Some(requested),
                    ..Default::default()
                },
            )
            .unwrap();

            let mut bopt = blocked_with(requested, false);
            let blocked = choose_blocked(&mat, &labels, &blocks, &bopt).unwrap();
            assert_eq!(blocked, simple);

            let min_blocked =
                choose_blocked(&mat, &labels, &blocks, &blocked_with(requested, true)).unwrap();
            assert_eq!(min_blocked, simple);

            let iblocked = choose_blocked_index(&mat, &labels, &blocks, &bopt).unwrap();
            assert_eq!(iblocked, strip_to_indices(&blocked));

            let sparse = SparseReference::from_dense(mat.as_ref());
            assert_eq!(choose_blocked(&sparse, &labels, &blocks, &bopt).unwrap(), simple);

            bopt.num_threads = 3;
            assert_eq!(choose_blocked(&mat, &labels, &blocks, &bopt).unwrap(), simple);
            bopt.use_minimum = true;
            assert_eq!(choose_blocked(&mat, &labels, &blocks, &bopt).unwrap(), simple);
        }
    }

    #[test]
    fn test_single_block_keep_ties() {
        let mat = faer::Mat::from_fn(100, 2, |r, c| {
            if (c == 0 && r < 50) || (c == 1 && r >= 50) {
                1.0
            } else {
                0.0
            }
        });
        let labels = vec![0, 1];
        let simple = choose(
            &mat,
            &labels,
            &ChooseOptions {
                number: Some(10),
                keep_ties: true,
                ..Default::default()
            },
        )
        .unwrap();

        for use_minimum in [false, true] {
            let bopt = ChooseBlockedOptions {
                number: Some(10),
                keep_ties: true,
                use_minimum,
                num_threads: 2,
                ..Default::default()
            };
            let blocked = choose_blocked(&mat, &labels, &[0, 0], &bopt).unwrap();
            assert_eq!(blocked, simple);
            assert_eq!(blocked[0][1].len(), 50);
        }
    }

    #[test]
    fn test_multiple_blocks_against_reference() {
        for requested in REQUESTED {
            let seed = requested as u64;
            // full density, otherwise the minimum is zero for most genes
            let mat1 = generate_expression(500, 50, 1.0, 1234 * seed);
            let mat2 = generate_expression(500, 50, 1.0, 9876 * seed);
            let labels1 = generate_labels(50, 5, 6789 * seed);
            let labels2 = generate_labels(50, 5, 4321 * seed);

            let medians1 = grouped_medians(mat1.as_ref(), &labels1);
            let medians2 = grouped_medians(mat2.as_ref(), &labels2);

            let reference = |use_minimum: bool| -> Markers<(usize, f64)> {
                (0..5)
                    .map(|l| {
                        (0..5)
                            .map(|l2| {
                                if l == l2 {
                                    return Vec::new();
                                }
                                let scores: Vec<f64> = (0..500)
                                    .map(|r| {
                                        let d1 = medians1[l][r] - medians1[l2][r];
                                        let d2 = medians2[l][r] - medians2[l2][r];
                                        if use_minimum {
                                            d1.min(d2)
                                        } else {
                                            (d1 + d2) / 2.0
                                        }
                                    })
                                    .collect();
                                pick_top(&scores, requested)
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect()
            };

            let combined = colbind_matrices(&[mat1, mat2]);
            let mut blocks = vec![0_usize; 50];
            blocks.extend(vec![1_usize; 50]);
            let mut labels = labels1.clone();
            labels.extend(labels2.iter().copied());

            let mut bopt = blocked_with(requested, false);
            let mean_blocked = choose_blocked(&combined, &labels, &blocks, &bopt).unwrap();
            assert_eq!(mean_blocked, reference(false));

            let min_blocked =
                choose_blocked(&combined, &labels, &blocks, &blocked_with(requested, true))
                    .unwrap();
            assert_eq!(min_blocked, reference(true));

            bopt.num_threads = 3;
            assert_eq!(
                choose_blocked(&combined, &labels, &blocks, &bopt).unwrap(),
                mean_blocked
            );
            bopt.use_minimum = true;
            assert_eq!(
                choose_blocked(&combined, &labels, &blocks, &bopt).unwrap(),
                min_blocked
            );
        }
    }

    #[test]
    fn test_mean_sign_symmetry() {
        let mat1 = generate_expression(100, 20, 1.0, 31);
        let mat2 = generate_expression(100, 20, 1.0, 32);
        let labels1 = generate_labels(20, 3, 33);
        let labels2 = generate_labels(20, 3, 34);
        let medians1 = grouped_medians(mat1.as_ref(), &labels1);
        let medians2 = grouped_medians(mat2.as_ref(), &labels2);

        let combined = colbind_matrices(&[mat1, mat2]);
        let mut blocks = vec![0_usize; 20];
        blocks.extend(vec![1_usize; 20]);
        let mut labels = labels1;
        labels.extend(labels2);

        let out = choose_blocked(&combined, &labels, &blocks, &blocked_with(100, false)).unwrap();
        for g1 in 0..3 {
            for g2 in 0..3 {
                for &(r, score) in out[g1].get(g2).into_iter().flatten() {
                    let reverse_mean = ((medians1[g2][r] - medians1[g1][r])
                        + (medians2[g2][r] - medians2[g1][r]))
                        / 2.0;
                    assert!((reverse_mean + score).abs() < 1e-12);
                    assert!(!out[g2][g1].iter().any(|&(r2, _)| r2 == r));
                }
            }
        }
    }

    #[test]
    fn test_minimum_is_direction_specific() {
        // two labels, two blocks; combination index = block * 2 + label
        // block 0: label 1 - label 0 = 3, block 1: label 1 - label 0 = 1
        let medians = vec![0.0, 3.0, 5.0, 6.0];
        let (forward, reverse) = minimum_block_delta(&medians, 1, 0, 2, 2).unwrap();
        assert_eq!(forward, 1.0);
        // not -1: the reverse direction takes its own minimum
        assert_eq!(reverse, -3.0);

        // the mean stays symmetric
        assert_eq!(mean_block_delta(&medians, 1, 0, 2, 2), Some(2.0));
        assert_eq!(mean_block_delta(&medians, 0, 1, 2, 2), Some(-2.0));

        // inconsistent direction across blocks: neither side is positive
        let medians = vec![0.0, 2.0, 1.0, 0.0];
        let (forward, reverse) = minimum_block_delta(&medians, 1, 0, 2, 2).unwrap();
        assert_eq!(forward, -1.0);
        assert_eq!(reverse, -2.0);
        assert_eq!(mean_block_delta(&medians, 1, 0, 2, 2), Some(0.5));
    }

    #[test]
    fn test_aggregation_skips_missing_blocks() {
        let medians = vec![1.0, 4.0, f64::NAN, 2.0];
        assert_eq!(mean_block_delta(&medians, 1, 0, 2, 2), Some(3.0));
        assert_eq!(minimum_block_delta(&medians, 1, 0, 2, 2), Some((3.0, -3.0)));

        let all_missing = vec![f64::NAN, 4.0, 1.0, f64::NAN];
        assert_eq!(mean_block_delta(&all_missing, 1, 0, 2, 2), None);
        assert_eq!(minimum_block_delta(&all_missing, 1, 0, 2, 2), None);
    }

    #[test]
    fn test_minimum_matrix_level_asymmetry() {
        // one gene, label 1 higher than label 0 in both blocks by 3 and 1
        let mat = mat![[0.0, 3.0, 5.0, 6.0]];
        let labels = vec![0, 1, 0, 1];
        let blocks = vec![0, 0, 1, 1];

        let min_out = choose_blocked(&mat, &labels, &blocks, &blocked_with(5, true)).unwrap();
        assert_eq!(min_out[1][0], vec![(0, 1.0)]);
        assert!(min_out[0][1].is_empty());

        let mean_out = choose_blocked(&mat, &labels, &blocks, &blocked_with(5, false)).unwrap();
        assert_eq!(mean_out[1][0], vec![(0, 2.0)]);
        assert!(mean_out[0][1].is_empty());

        // sign flips between blocks: only the mean reports it
        let flip = mat![[0.0, 2.0, 1.0, 0.0]];
        let min_out = choose_blocked(&flip, &labels, &blocks, &blocked_with(5, true)).unwrap();
        assert!(min_out[1][0].is_empty() && min_out[0][1].is_empty());
        let mean_out = choose_blocked(&flip, &labels, &blocks, &blocked_with(5, false)).unwrap();
        assert_eq!(mean_out[1][0], vec![(0, 0.5)]);
    }

    #[test]
    fn test_overlapping_labels() {
        let requested = 20;
        let nsamples = 50;
        let mat1 = generate_expression(500, nsamples, 1.0, 1234);
        let mat2 = generate_expression(500, nsamples, 1.0, 9876);
        let labels1 = generate_labels(nsamples, 5, 6789);
        let labels2 = generate_labels(nsamples, 5, 4321);

        let copts = ChooseOptions {
            number: Some(requested),
            ..Default::default()
        };
        let basic1 = choose(&mat1, &labels1, &copts).unwrap();
        let basic2 = choose(&mat2, &labels2, &copts).unwrap();

        // label 0 only in block 0, label 5 only in block 1
        let combined = colbind_matrices(&[mat1, mat2]);
        let mut blocks = vec![0_usize; nsamples];
        blocks.extend(vec![1_usize; nsamples]);
        let mut labels = labels1.clone();
        labels.extend(labels2.iter().map(|l| l + 1));

        let subset: Vec<usize> = (0..labels.len())
            .filter(|&i| labels[i] >= 1 && labels[i] < 5)
            .collect();
        let sub_mat = subset_columns(combined.as_ref(), &subset);
        let sub_labels: Vec<usize> = subset.iter().map(|&i| labels[i] - 1).collect();
        let sub_blocks: Vec<usize> = subset.iter().map(|&i| blocks[i]).collect();

        for use_minimum in [false, true] {
            let bopt = blocked_with(requested, use_minimum);
            let blocked = choose_blocked(&combined, &labels, &blocks, &bopt).unwrap();
            let subblocked = choose_blocked(&sub_mat, &sub_labels, &sub_blocks, &bopt).unwrap();

            for l in 0..=5 {
                for l2 in 0..=5 {
                    let res = &blocked[l][l2];
                    if l == l2 || (l == 0 && l2 == 5) || (l == 5 && l2 == 0) {
                        assert!(res.is_empty());
                    } else if l == 0 || l2 == 0 {
                        assert_eq!(res, &basic1[l][l2]);
                    } else if l == 5 || l2 == 5 {
                        assert_eq!(res, &basic2[l - 1][l2 - 1]);
                    } else {
                        assert_eq!(res, &subblocked[l - 1][l2 - 1]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_impossible_comparisons() {
        let mat = generate_expression(500, 50, 0.3, 1234);
        let labels = generate_labels(50, 5, 6789);
        // label 3 is alone in block 1
        let blocks: Vec<usize> = labels.iter().map(|&l| (l == 3) as usize).collect();

        let keep: Vec<usize> = (0..50).filter(|&i| labels[i] != 3).collect();
        let sub_mat = subset_columns(mat.as_ref(), &keep);
        let sub_labels: Vec<usize> = keep.iter().map(|&i| labels[i]).collect();

        let blocked =
            choose_blocked(&mat, &labels, &blocks, &ChooseBlockedOptions::default()).unwrap();
        let subblocked = choose(&sub_mat, &sub_labels, &ChooseOptions::default()).unwrap();

        for l in 0..5 {
            for l2 in 0..5 {
                if l == l2 || l == 3 || l2 == 3 {
                    assert!(blocked[l][l2].is_empty());
                    assert!(subblocked[l][l2].is_empty());
                    continue;
                }
                assert_eq!(blocked[l][l2], subblocked[l][l2]);
            }
        }
    }

    #[test]
    fn test_degenerate_and_invalid() {
        let mat = generate_expression(20, 6, 1.0, 2);
        let labels = vec![0, 1, 2, 0, 1, 2];
        let blocks = vec![0, 0, 0, 1, 1, 1];

        let none = choose_blocked(&mat, &labels, &blocks, &blocked_with(0, false)).unwrap();
        assert_marker_layout!(none, 3, 0);

        let some = choose_blocked(&mat, &labels, &blocks, &blocked_with(4, true)).unwrap();
        assert_marker_layout!(some, 3, 4);

        let res = choose_blocked(&mat, &labels, &blocks[..5], &ChooseBlockedOptions::default());
        assert!(matches!(
            res,
            Err(MarkerError::LengthMismatch { what: "blocks", .. })
        ));

        // label and block counts whose product cannot be represented
        let huge = 1_usize << (usize::BITS / 2 + 1);
        let wide = mat![[1.0, 2.0]];
        let res = choose_blocked(&wide, &[0, huge], &[huge, 0], &blocked_with(1, false));
        assert!(matches!(res, Err(MarkerError::SizeOverflow { .. })));
    }
}
