//! In-memory upstream collaborators for testing.

use crate::RecordId;
use crate::error::{UpstreamErrorKind, UpstreamResult};
use crate::upstream::{
    AuthorIdentityLog, CitationGraph, DetectionContext, Detectors, RecordIdStream, RecordStore, SelfCiteDetector,
    Upstream,
};
use async_stream::stream;
use async_trait::async_trait;
use selfcites_config::AuthorTags;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use time::UtcDateTime;
use tokio::sync::RwLock;

/// Shorthand for a Unix timestamp in seconds.
///
/// Panics on out-of-range input; test setup that is wrong should not pass.
pub fn at(timestamp: i64) -> UtcDateTime {
    match UtcDateTime::from_unix_timestamp(timestamp) {
        Ok(time) => time,
        Err(_) => panic!("mock::at: timestamp {timestamp} out of range"),
    }
}

/// Record store, citation graph and identity log in one in-memory value.
///
/// Built with the `with_*` methods; the `touch`/`set_*` methods change it
/// while a test is running, e.g. to simulate a record modified between two
/// passes.
#[derive(Debug)]
pub struct MemoryUpstream {
    records: RwLock<BTreeMap<RecordId, UtcDateTime>>,
    references: RwLock<BTreeMap<RecordId, BTreeSet<RecordId>>>,
    last_indexed: RwLock<UtcDateTime>,
    identity_update: RwLock<Option<UtcDateTime>>,
}

impl Default for MemoryUpstream {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            references: RwLock::new(BTreeMap::new()),
            last_indexed: RwLock::new(UtcDateTime::UNIX_EPOCH),
            identity_update: RwLock::new(None),
        }
    }
}

impl MemoryUpstream {
    pub fn with_record(mut self, record: RecordId, modified: UtcDateTime) -> Self {
        self.records.get_mut().insert(record, modified);
        self
    }

    pub fn with_references(mut self, record: RecordId, references: impl IntoIterator<Item = RecordId>) -> Self {
        self.references.get_mut().insert(record, references.into_iter().collect());
        self
    }

    pub fn with_last_indexed(mut self, indexed: UtcDateTime) -> Self {
        *self.last_indexed.get_mut() = indexed;
        self
    }

    pub fn with_identity_update(mut self, updated: UtcDateTime) -> Self {
        *self.identity_update.get_mut() = Some(updated);
        self
    }

    /// Create or modify a record.
    pub async fn touch(&self, record: RecordId, modified: UtcDateTime) {
        self.records.write().await.insert(record, modified);
    }

    pub async fn set_last_indexed(&self, indexed: UtcDateTime) {
        *self.last_indexed.write().await = indexed;
    }

    pub async fn set_identity_update(&self, updated: UtcDateTime) {
        *self.identity_update.write().await = Some(updated);
    }

    /// Bundle into an [`Upstream`] using the given detectors.
    pub fn into_upstream(self: Arc<Self>, simple: Arc<MemoryDetector>, friends: Arc<MemoryDetector>) -> Upstream {
        Upstream {
            records: self.clone(),
            citations: self.clone(),
            identities: self,
            detectors: Detectors { simple, friends },
        }
    }
}

#[async_trait]
impl RecordStore for MemoryUpstream {
    async fn max_modification(&self, records: &BTreeSet<RecordId>) -> UpstreamResult<Option<UtcDateTime>> {
        let guard = self.records.read().await;
        Ok(records.iter().filter_map(|record| guard.get(record)).max().copied())
    }

    fn all_record_ids(&self) -> RecordIdStream<'_> {
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding.
            let ids: Vec<RecordId> = self.records.read().await.keys().copied().collect();
            for id in ids {
                yield Ok(id);
            }
        })
    }

    async fn modified_within(&self, after: UtcDateTime, until: UtcDateTime) -> UpstreamResult<BTreeSet<RecordId>> {
        let guard = self.records.read().await;
        Ok(guard.iter().filter(|(_, modified)| **modified > after && **modified <= until).map(|(id, _)| *id).collect())
    }
}

#[async_trait]
impl CitationGraph for MemoryUpstream {
    async fn references(&self, record: RecordId) -> UpstreamResult<BTreeSet<RecordId>> {
        Ok(self.references.read().await.get(&record).cloned().unwrap_or_default())
    }

    async fn last_indexed(&self) -> UpstreamResult<UtcDateTime> {
        Ok(*self.last_indexed.read().await)
    }
}

#[async_trait]
impl AuthorIdentityLog for MemoryUpstream {
    async fn last_update(&self) -> UpstreamResult<Option<UtcDateTime>> {
        Ok(*self.identity_update.read().await)
    }
}

/// A call received by a [`MemoryDetector`], in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorCall {
    Reset,
    Prepare(RecordId),
    Detect(RecordId),
}

/// Detector answering from a fixed table and logging every call.
///
/// Records without an entry in the table have no self-citations.
#[derive(Debug, Default)]
pub struct MemoryDetector {
    results: RwLock<BTreeMap<RecordId, BTreeSet<RecordId>>>,
    prepass: bool,
    fail_on: Option<RecordId>,
    calls: RwLock<Vec<DetectorCall>>,
}

impl MemoryDetector {
    /// A detector that requires a rebuild pre-pass, like `friends`.
    pub fn with_prepass() -> Self {
        Self { prepass: true, ..Self::default() }
    }

    pub fn with_result(mut self, citee: RecordId, citers: impl IntoIterator<Item = RecordId>) -> Self {
        self.results.get_mut().insert(citee, citers.into_iter().collect());
        self
    }

    /// Fail every detection of `record`.
    pub fn failing_on(mut self, record: RecordId) -> Self {
        self.fail_on = Some(record);
        self
    }

    pub async fn set_result(&self, citee: RecordId, citers: impl IntoIterator<Item = RecordId>) {
        self.results.write().await.insert(citee, citers.into_iter().collect());
    }

    pub async fn calls(&self) -> Vec<DetectorCall> {
        self.calls.read().await.clone()
    }

    /// Records passed to [`detect`](SelfCiteDetector::detect), in order.
    pub async fn detected(&self) -> Vec<RecordId> {
        let calls = self.calls.read().await;
        calls
            .iter()
            .filter_map(|call| match call {
                DetectorCall::Detect(record) => Some(*record),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SelfCiteDetector for MemoryDetector {
    async fn detect(&self, record: RecordId, _tags: &AuthorTags) -> UpstreamResult<BTreeSet<RecordId>> {
        self.calls.write().await.push(DetectorCall::Detect(record));
        if self.fail_on == Some(record) {
            exn::bail!(UpstreamErrorKind::Unavailable(format!("detector refused record {record}")));
        }
        Ok(self.results.read().await.get(&record).cloned().unwrap_or_default())
    }

    fn requires_prepass(&self) -> bool {
        self.prepass
    }

    async fn prepare(&self, record: RecordId, _context: &DetectionContext<'_>) -> UpstreamResult<()> {
        self.calls.write().await.push(DetectorCall::Prepare(record));
        Ok(())
    }

    async fn reset(&self) -> UpstreamResult<()> {
        self.calls.write().await.push(DetectorCall::Reset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_record_ids_are_ascending_and_restartable() {
        let upstream = MemoryUpstream::default().with_record(30, at(1)).with_record(4, at(1)).with_record(12, at(1));
        let first: Vec<RecordId> = upstream.all_record_ids().try_collect().await.unwrap();
        let second: Vec<RecordId> = upstream.all_record_ids().try_collect().await.unwrap();
        assert_eq!(first, vec![4, 12, 30]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_modified_within_is_half_open() {
        let upstream = MemoryUpstream::default().with_record(1, at(100)).with_record(2, at(200)).with_record(3, at(300));
        let ids = upstream.modified_within(at(100), at(200)).await.unwrap();
        assert_eq!(ids, BTreeSet::from([2]));
    }

    #[tokio::test]
    async fn test_max_modification_ignores_unknown() {
        let upstream = MemoryUpstream::default().with_record(1, at(100)).with_record(2, at(200));
        assert_eq!(upstream.max_modification(&BTreeSet::from([1, 2, 9])).await.unwrap(), Some(at(200)));
        assert_eq!(upstream.max_modification(&BTreeSet::from([9])).await.unwrap(), None);
        assert_eq!(upstream.max_modification(&BTreeSet::new()).await.unwrap(), None);
    }
}
