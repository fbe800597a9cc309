//! Everything and anything related to the Rust <> R interface for single
//! cell.

pub mod r_markers;
