pub mod detect;

pub use detect::{detect_columns, ColumnRole, DetectError, DetectedColumn, DetectedColumns};
