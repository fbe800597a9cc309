//! Classic marker selection for labelled reference datasets.
//!
//! For every ordered pair of labels, genes are ranked by the difference
//! between the per-label median expression and the top genes are kept as
//! markers. The blocked variant computes the differences within each block
//! (batch) first and combines them across blocks.

pub mod blocked;
pub mod choose;
pub mod number;
pub mod scan;
pub mod top_queue;

pub use blocked::{choose_blocked, choose_blocked_index, ChooseBlockedOptions};
pub use choose::{choose, choose_index, ChooseOptions};
pub use number::{default_number, get_num_keep};
pub use top_queue::{Markers, MarkerOutput};
