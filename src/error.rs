//! Top-level Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for self-citation cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which stage of a run failed.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configuration is missing or invalid. Nothing was touched.
    #[display("invalid configuration")]
    Configuration,
    /// The cache database could not be opened.
    #[display("self-citation cache unavailable")]
    Cache,
    /// A refresh pass failed; its watermark was not advanced.
    #[display("self-citation refresh failed")]
    Refresh,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cache | Self::Refresh)
    }
}
