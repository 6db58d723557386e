pub mod file_ops;
pub mod logging;
pub mod parallel;
pub mod playlist;
pub mod reporting;
pub mod sanitize;
