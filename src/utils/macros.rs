///////////////////
// Matrix macros //
///////////////////

/// Assertion that two matrices have the same number of rows.
#[macro_export]
macro_rules! assert_nrows {
    ($matrix1:expr, $matrix2:expr) => {
        assert_eq!(
            $matrix1.nrows(),
            $matrix2.nrows(),
            "Matrices have different number of rows: {} != {}",
            $matrix1.nrows(),
            $matrix2.nrows()
        );
    };
}

///////////////////
// Marker macros //
///////////////////

/// Assertion that a marker structure has the `ngroups x ngroups` layout,
/// empty diagonals and no more than `$max` entries in any comparison.
#[macro_export]
macro_rules! assert_marker_layout {
    ($markers:expr, $ngroups:expr, $max:expr) => {{
        let markers = &$markers;
        assert_eq!(
            markers.len(),
            $ngroups,
            "Marker list has {} labels, expected {}",
            markers.len(),
            $ngroups
        );
        for (g1, row) in markers.iter().enumerate() {
            assert_eq!(
                row.len(),
                $ngroups,
                "Label {} has {} comparisons, expected {}",
                g1,
                row.len(),
                $ngroups
            );
            assert!(row[g1].is_empty(), "Label {} compared to itself", g1);
            for (g2, entries) in row.iter().enumerate() {
                assert!(
                    entries.len() <= $max,
                    "Comparison {} vs {} has {} markers, maximum is {}",
                    g1,
                    g2,
                    entries.len(),
                    $max
                );
            }
        }
    }};
}
