//! Display formatting helpers shared by the front ends.

pub mod format;

pub use format::{format_cell, format_count, format_decimal_count, truncate_string};
