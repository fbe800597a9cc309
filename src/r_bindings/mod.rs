pub mod r_single_cell;
