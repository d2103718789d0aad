// src/process/mod.rs
pub mod aggregate;
pub mod raw_table;
pub mod reshape;

pub use aggregate::{compare_to_basket, ResultRow, ResultTable};
pub use raw_table::RawTable;
pub use reshape::{prepare_wide, Observation, WideTable};
