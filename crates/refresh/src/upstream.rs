//! Interfaces of the services the cache is derived from.
//!
//! None of these are implemented here: the record store, the citation
//! graph, author-identity resolution and self-citation detection all live
//! with the host. Implementations only need to be `Send + Sync` so a host can
//! share them behind an [`Arc`].

use crate::RecordId;
use crate::error::UpstreamResult;
use async_trait::async_trait;
use futures::Stream;
use selfcites_config::{Algorithm, AuthorTags};
use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::Arc;
use time::UtcDateTime;

pub type RecordIdStream<'a> = Pin<Box<dyn Stream<Item = UpstreamResult<RecordId>> + Send + 'a>>;

/// Record metadata owned by the bibliographic record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The latest modification time among `records`.
    ///
    /// Records unknown to the store are ignored; `None` means none of them
    /// exist (or `records` is empty).
    async fn max_modification(&self, records: &BTreeSet<RecordId>) -> UpstreamResult<Option<UtcDateTime>>;

    /// Every record id, in ascending order.
    ///
    /// The stream must be finite, and calling this again must start over
    /// from the lowest id.
    fn all_record_ids(&self) -> RecordIdStream<'_>;

    /// Records whose modification time falls in `(after, until]`.
    async fn modified_within(&self, after: UtcDateTime, until: UtcDateTime) -> UpstreamResult<BTreeSet<RecordId>>;
}

/// The citation graph built by the citation indexer.
#[async_trait]
pub trait CitationGraph: Send + Sync {
    /// Records that `record` cites.
    async fn references(&self, record: RecordId) -> UpstreamResult<BTreeSet<RecordId>>;

    /// When the citation indexer last finished processing.
    async fn last_indexed(&self) -> UpstreamResult<UtcDateTime>;
}

/// The update log of author-identity resolution.
#[async_trait]
pub trait AuthorIdentityLog: Send + Sync {
    /// Time of the most recent identity update, `None` if the log is empty.
    async fn last_update(&self) -> UpstreamResult<Option<UtcDateTime>>;
}

/// Settings a detector may need while building its auxiliary indexes.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub algorithm: Algorithm,
    pub friends_threshold: u32,
    pub tags: &'a AuthorTags,
}

/// A self-citation detection strategy.
#[async_trait]
pub trait SelfCiteDetector: Send + Sync {
    /// Citers of `record` judged to be self-citations.
    async fn detect(&self, record: RecordId, tags: &AuthorTags) -> UpstreamResult<BTreeSet<RecordId>>;

    /// Whether a full rebuild must call [`prepare`](Self::prepare) on every
    /// record before the first [`detect`](Self::detect).
    fn requires_prepass(&self) -> bool {
        false
    }

    /// Populate the detector's auxiliary indexes for one record.
    async fn prepare(&self, _record: RecordId, _context: &DetectionContext<'_>) -> UpstreamResult<()> {
        Ok(())
    }

    /// Empty the detector's auxiliary indexes.
    async fn reset(&self) -> UpstreamResult<()> {
        Ok(())
    }
}

/// The closed set of detection strategies a host provides.
#[derive(Clone)]
pub struct Detectors {
    pub simple: Arc<dyn SelfCiteDetector>,
    pub friends: Arc<dyn SelfCiteDetector>,
}
impl Detectors {
    pub fn select(&self, algorithm: Algorithm) -> &dyn SelfCiteDetector {
        match algorithm {
            Algorithm::Simple => self.simple.as_ref(),
            Algorithm::Friends => self.friends.as_ref(),
        }
    }
}

/// Handles to every upstream collaborator of a refresh pass.
#[derive(Clone)]
pub struct Upstream {
    pub records: Arc<dyn RecordStore>,
    pub citations: Arc<dyn CitationGraph>,
    pub identities: Arc<dyn AuthorIdentityLog>,
    pub detectors: Detectors,
}
