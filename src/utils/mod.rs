//! Utility modules
//!
//! - Frame helpers: column validation and typed extraction
//! - Output: CSV/Parquet reading and writing by extension

pub mod frame_helpers;
pub mod output;

pub use frame_helpers::{bool_values, float_values, require_columns, string_values};
pub use output::{read_table, write_table, TableFormat};
