//! Module containing the key statistic functions: medians with implicit
//! zeros and group tabulation.

pub mod stats;
