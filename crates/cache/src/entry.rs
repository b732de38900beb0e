use crate::RecordId;
use std::collections::BTreeSet;
use time::UtcDateTime;

/// Cached self-citation result for a single citee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub citee: RecordId,
    /// Number of self-citations found.
    pub count: u64,
    /// The citee's outbound references when the count was computed, kept
    /// for auditing which records the computation depended on.
    pub references: Vec<RecordId>,
    pub last_updated: UtcDateTime,
}

/// A single stored (citee, citer) self-citation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub citee: RecordId,
    pub citer: RecordId,
    /// When this pair was first recorded.
    pub last_updated: UtcDateTime,
}

/// The writes needed to bring one citee's stored state up to date.
///
/// Applied atomically by [`Repository::apply`](crate::Repository::apply):
/// citers in `insert` are added (stamped with the entry's `last_updated`),
/// citers in `delete` are removed, and the entry is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    pub insert: BTreeSet<RecordId>,
    pub delete: BTreeSet<RecordId>,
    pub entry: CacheEntry,
}
