use faer::Mat;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

////////////////
// Structures //
////////////////

/// Structure for a synthetic labelled reference
///
/// ### Fields
///
/// * `expression` - Genes x samples matrix of standard normal values with
///   a fraction of exact zeros.
/// * `labels` - The label (0-indexed) of each sample.
#[derive(Clone, Debug)]
pub struct SyntheticReference {
    pub expression: Mat<f64>,
    pub labels: Vec<usize>,
}

/////////////
// Helpers //
/////////////

/// Generate a random expression matrix
///
/// Every entry is non-zero with probability `density`; non-zero entries are
/// drawn from a standard normal.
///
/// ### Params
///
/// * `n_genes` - Number of rows.
/// * `n_samples` - Number of columns.
/// * `density` - Probability of an entry being non-zero. `1.0` gives a
///   fully dense matrix.
/// * `seed` - Seed for reproducibility purposes.
///
/// ### Returns
///
/// The genes x samples matrix.
pub fn generate_expression(n_genes: usize, n_samples: usize, density: f64, seed: u64) -> Mat<f64> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut mat = Mat::zeros(n_genes, n_samples);
    for col in 0..n_samples {
        for row in 0..n_genes {
            if rng.random::<f64>() <= density {
                mat[(row, col)] = rng.sample(StandardNormal);
            }
        }
    }
    mat
}

/// Generate random sample labels
///
/// Each of the `n_labels` labels is used at least once (given enough
/// samples); the remainder is assigned uniformly and the result shuffled.
///
/// ### Params
///
/// * `n_samples` - Number of samples.
/// * `n_labels` - Number of distinct labels.
/// * `seed` - Seed for reproducibility purposes.
///
/// ### Returns
///
/// Vector of labels in `[0, n_labels)`.
pub fn generate_labels(n_samples: usize, n_labels: usize, seed: u64) -> Vec<usize> {
    if n_labels == 0 {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut labels: Vec<usize> = (0..n_samples)
        .map(|i| {
            if i < n_labels {
                i
            } else {
                rng.random_range(0..n_labels)
            }
        })
        .collect();
    labels.shuffle(&mut rng);
    labels
}

////////////////////
// Main functions //
////////////////////

/// Generate a synthetic labelled reference
///
/// ### Params
///
/// * `n_genes` - Number of genes.
/// * `n_samples` - Number of samples.
/// * `n_labels` - Number of labels.
/// * `density` - Probability of an entry being non-zero.
/// * `seed` - Seed for reproducibility purposes.
///
/// ### Returns
///
/// The `SyntheticReference`.
pub fn generate_reference(
    n_genes: usize,
    n_samples: usize,
    n_labels: usize,
    density: f64,
    seed: u64,
) -> SyntheticReference {
    SyntheticReference {
        expression: generate_expression(n_genes, n_samples, density, seed),
        labels: generate_labels(n_samples, n_labels, seed.wrapping_add(42)),
    }
}
