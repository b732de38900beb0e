//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every variant is fatal: a pass must not start without a usable
/// configuration.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configuration file does not exist or is not a regular file.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The configuration could not be parsed or is missing required keys.
    #[display("invalid configuration")]
    Invalid,
    /// A key parsed but holds an unusable value.
    #[display("invalid configuration value for '{_0}'")]
    InvalidValue(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
