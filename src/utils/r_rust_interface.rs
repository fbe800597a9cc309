use extendr_api::prelude::*;
use faer::MatRef;

use crate::single_cell::classic_markers::top_queue::Markers;

/////////////
// Vectors //
/////////////

/// Transform 0-indexed R integers into group indices
///
/// ### Params
///
/// * `what` - Name of the vector for the error message.
/// * `x` - The R integers.
///
/// ### Returns
///
/// The group indices, or an error if any value is negative or `NA`.
pub fn r_groups_to_usize(what: &str, x: &[i32]) -> extendr_api::Result<Vec<usize>> {
    x.iter()
        .map(|&v| {
            usize::try_from(v).map_err(|_| {
                Error::Other(format!(
                    "{} must be non-negative 0-indexed integers, found {}",
                    what, v
                ))
            })
        })
        .collect()
}

/// Transform a count into an R integer
///
/// ### Params
///
/// * `what` - Name of the value for the error message.
/// * `x` - The count.
///
/// ### Returns
///
/// The R integer, or an error if `x` exceeds `i32::MAX`.
pub fn usize_to_r_int(what: &str, x: usize) -> extendr_api::Result<i32> {
    i32::try_from(x).map_err(|_| {
        Error::Other(format!(
            "{} ({}) does not fit into an R integer",
            what, x
        ))
    })
}

//////////////
// Matrices //
//////////////

/// Transform an R matrix to a Faer one
pub fn r_matrix_to_faer(x: &RMatrix<f64>) -> MatRef<'_, f64> {
    let ncol = x.ncols();
    let nrow = x.nrows();
    let data = x.data();

    MatRef::from_column_major_slice(data, nrow, ncol)
}

/////////////
// Markers //
/////////////

/// Transform markers into a nested R list
///
/// ### Params
///
/// * `markers` - Markers indexed by `[g1][g2]`.
///
/// ### Returns
///
/// Nested list in which `[[g1]][[g2]]` holds a list with `rows` (0-indexed)
/// and `scores`.
pub fn markers_to_r_list(markers: Markers<(usize, f64)>) -> extendr_api::Result<List> {
    let mut result_list = List::new(markers.len());

    for (g1, row) in markers.into_iter().enumerate() {
        let mut inner_list = List::new(row.len());
        for (g2, entries) in row.into_iter().enumerate() {
            let (rows, scores): (Vec<i32>, Vec<f64>) =
                entries.into_iter().map(|(r, s)| (r as i32, s)).unzip();
            inner_list.set_elt(g2, Robj::from(list!(rows = rows, scores = scores)))?;
        }
        result_list.set_elt(g1, Robj::from(inner_list))?;
    }

    Ok(result_list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usize_to_r_int() {
        assert_eq!(usize_to_r_int("markers", 500).unwrap(), 500);
        assert_eq!(usize_to_r_int("markers", i32::MAX as usize).unwrap(), i32::MAX);
        assert!(usize_to_r_int("markers", i32::MAX as usize + 1).is_err());
    }

    #[test]
    fn test_r_groups_to_usize() {
        assert_eq!(r_groups_to_usize("labels", &[0, 2, 1]).unwrap(), vec![0, 2, 1]);
        assert!(r_groups_to_usize("labels", &[0, -1]).is_err());
    }
}
