pub mod error;
pub mod matrix_profile;
pub mod metric;
pub mod stats;
