//! Contains the single cell functionalities. Currently the classic marker
//! selection used to build reference-based cell type annotations.

pub mod classic_markers;
