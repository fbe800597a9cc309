pub mod core;
pub mod single_cell;
pub mod utils;

#[cfg(feature = "r")]
mod r_bindings;

pub use crate::core::data::reference_matrix::{ReferenceMatrix, SparseReference};
pub use crate::single_cell::classic_markers::*;
pub use crate::utils::errors::{MarkerError, Result};

#[cfg(feature = "r")]
use extendr_api::prelude::*;

#[cfg(feature = "r")]
pub use r_bindings::r_single_cell::r_markers;

#[cfg(feature = "r")]
extendr_module! {
    mod refmarkers;
    use r_markers;
}
