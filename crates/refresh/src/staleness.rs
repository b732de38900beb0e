//! Decides whether a cached entry still reflects its upstream records.

use crate::RecordId;
use crate::error::{ErrorKind, Result};
use crate::upstream::{CitationGraph, RecordStore};
use exn::ResultExt;
use selfcites_cache::Repository;
use std::collections::BTreeSet;
use time::UtcDateTime;

/// Outcome of checking a citee against the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The cached entry is at least as recent as every record it depends on.
    Fresh { count: u64 },
    /// No entry, or one older than a record it depends on.
    Stale,
    /// The citee does not exist in the record store.
    NotFound,
}

/// Compares a citee's cache entry against the modification times of the
/// citee and everything it references.
///
/// A change to a referenced record can change the detector's output for the
/// citee, so references count towards the citee's timestamp.
pub struct StalenessOracle<'a> {
    repo: &'a Repository,
    records: &'a dyn RecordStore,
    citations: &'a dyn CitationGraph,
}

impl<'a> StalenessOracle<'a> {
    pub fn new(repo: &'a Repository, records: &'a dyn RecordStore, citations: &'a dyn CitationGraph) -> Self {
        Self { repo, records, citations }
    }

    /// Whether the citee's cached entry can be used as is.
    ///
    /// A citee missing from the record store is never fresh.
    pub async fn is_fresh(&self, citee: RecordId) -> Result<bool> {
        let references = self.citations.references(citee).await.or_raise(|| ErrorKind::CitationGraph)?;
        Ok(matches!(self.assess(citee, &references).await?, Freshness::Fresh { .. }))
    }

    /// Check a citee whose current references the caller already fetched.
    pub async fn assess(&self, citee: RecordId, references: &BTreeSet<RecordId>) -> Result<Freshness> {
        let Some(record_timestamp) = self.record_timestamp(citee, references).await? else {
            return Ok(Freshness::NotFound);
        };
        let entry = self.repo.get_entry(citee).await.or_raise(|| ErrorKind::Cache)?;
        Ok(match entry {
            Some(entry) if entry.last_updated >= record_timestamp => Freshness::Fresh { count: entry.count },
            _ => Freshness::Stale,
        })
    }

    /// Latest modification among the citee and its references, or `None`
    /// if the citee itself is unknown.
    async fn record_timestamp(
        &self,
        citee: RecordId,
        references: &BTreeSet<RecordId>,
    ) -> Result<Option<UtcDateTime>> {
        let own = self
            .records
            .max_modification(&BTreeSet::from([citee]))
            .await
            .or_raise(|| ErrorKind::RecordStore)?;
        let Some(own) = own else {
            return Ok(None);
        };
        if references.is_empty() {
            return Ok(Some(own));
        }
        let referenced = self.records.max_modification(references).await.or_raise(|| ErrorKind::RecordStore)?;
        Ok(Some(referenced.map_or(own, |referenced| referenced.max(own))))
    }
}
