//! Refresh Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A refresh error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for refresh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a failed pass.
///
/// Every variant aborts the pass it happened in; the watermark is left
/// untouched so the next pass retries the same window. A record missing from
/// the record store is *not* an error (it is skipped and logged).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Reading or writing the [cache](selfcites_cache::Repository) failed.
    #[display("self-citation cache storage failed")]
    Cache,
    /// The record store could not be queried.
    #[display("record store unavailable")]
    RecordStore,
    /// The citation graph could not be queried.
    #[display("citation graph unavailable")]
    CitationGraph,
    /// The author-identity log could not be queried.
    #[display("author identity log unavailable")]
    IdentityLog,
    /// The self-citation detector failed on a record.
    #[display("self-citation detection failed for record {_0}")]
    Detector(#[error(not(source))] u64),
    /// The detector could not reset or populate its auxiliary indexes.
    #[display("self-citation detector indexes could not be rebuilt")]
    DetectorIndexes,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Detector(_) | Self::DetectorIndexes)
    }
}

/// An error raised by an upstream collaborator implementation.
pub type UpstreamError = exn::Exn<UpstreamErrorKind>;
/// Result type alias for upstream collaborator calls.
pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

/// Failure categories upstream implementations report back.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// The service or its backing store could not be reached.
    #[display("upstream unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// The service answered with data that makes no sense.
    #[display("upstream returned invalid data: {_0}")]
    InvalidData(#[error(not(source))] String),
}
