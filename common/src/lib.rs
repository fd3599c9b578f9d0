//! Types, column names and process setup shared by the half-to-full-cell crates.
pub mod columns;
pub mod logging;

pub use logging::{LoggingError, LoggingOpts, init_tracing};

/// Floating point type used for every measured or derived quantity.
pub type Real = f64;

/// Integer type used for cycle counters and step identifiers.
pub type Count = i64;

/// Expands to a version string taken from `git describe`, or `"unknown"` when
/// the build does not happen inside a git checkout.
#[macro_export]
macro_rules! version {
    () => {
        git_version::git_version!(args = ["--tags", "--always", "--dirty=-modified"], fallback = "unknown")
    };
}
