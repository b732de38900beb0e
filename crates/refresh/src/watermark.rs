//! The "processed up to" boundary of a method.

use crate::accumulator::Accumulator;
use crate::error::{ErrorKind, Result};
use crate::upstream::{AuthorIdentityLog, CitationGraph};
use exn::ResultExt;
use selfcites_cache::Repository;
use time::UtcDateTime;

/// Boundary used when nothing has been recorded yet.
pub const EPOCH: UtcDateTime = UtcDateTime::UNIX_EPOCH;

/// Reads and advances a method's watermark.
///
/// Self-citations are only correct once both the citation graph and (when
/// enabled) author-identity resolution have caught up, so the safe boundary
/// is set by the slower of the two.
pub struct WatermarkTracker<'a> {
    repo: &'a Repository,
    method: &'a str,
    citations: &'a dyn CitationGraph,
    identities: Option<&'a dyn AuthorIdentityLog>,
}

impl<'a> WatermarkTracker<'a> {
    /// `identities` is `None` when the identity log should not bound the
    /// window.
    pub fn new(
        repo: &'a Repository,
        method: &'a str,
        citations: &'a dyn CitationGraph,
        identities: Option<&'a dyn AuthorIdentityLog>,
    ) -> Self {
        Self { repo, method, citations, identities }
    }

    /// The latest time up to which every upstream has finished processing.
    pub async fn compute_safe_boundary(&self) -> Result<UtcDateTime> {
        let indexed = self.citations.last_indexed().await.or_raise(|| ErrorKind::CitationGraph)?;
        let Some(identities) = self.identities else {
            return Ok(indexed);
        };
        let resolved = identities.last_update().await.or_raise(|| ErrorKind::IdentityLog)?.unwrap_or(EPOCH);
        Ok(indexed.min(resolved))
    }

    /// The stored watermark, or [`EPOCH`] if the method never completed a
    /// pass.
    pub async fn previous(&self) -> Result<UtcDateTime> {
        let stored = self.repo.watermark(self.method).await.or_raise(|| ErrorKind::Cache)?;
        Ok(stored.unwrap_or(EPOCH))
    }

    /// Flush the pass's counts and, if given, raise the watermark.
    ///
    /// Must only be called once every record of the pass succeeded.
    pub async fn finalize(&self, accumulator: &Accumulator, watermark: Option<UtcDateTime>) -> Result<()> {
        self.repo
            .store_method(self.method, accumulator.counts(), watermark)
            .await
            .or_raise(|| ErrorKind::Cache)?;
        match watermark {
            Some(watermark) => tracing::info!(method = self.method, %watermark, "Stored watermark"),
            None => tracing::info!(method = self.method, "Stored counts; watermark unchanged"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryUpstream, at};
    use rstest::rstest;
    use selfcites_cache::Database;

    #[rstest]
    #[case::identity_log_slower(Some(500), 1_000, true, 500)]
    #[case::citation_index_slower(Some(2_000), 1_000, true, 1_000)]
    #[case::identity_log_empty(None, 1_000, true, 0)]
    #[case::identity_log_disabled(Some(500), 1_000, false, 1_000)]
    #[tokio::test]
    async fn test_safe_boundary(
        #[case] identity: Option<i64>,
        #[case] indexed: i64,
        #[case] use_identity: bool,
        #[case] expected: i64,
    ) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let mut upstream = MemoryUpstream::default().with_last_indexed(at(indexed));
        if let Some(identity) = identity {
            upstream = upstream.with_identity_update(at(identity));
        }
        let identities: Option<&dyn AuthorIdentityLog> = use_identity.then_some(&upstream as &dyn AuthorIdentityLog);
        let tracker = WatermarkTracker::new(&repo, "selfcites", &upstream, identities);
        assert_eq!(tracker.compute_safe_boundary().await.unwrap(), at(expected));
    }

    #[tokio::test]
    async fn test_previous_defaults_to_epoch() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let upstream = MemoryUpstream::default();
        let tracker = WatermarkTracker::new(&repo, "selfcites", &upstream, None);
        assert_eq!(tracker.previous().await.unwrap(), EPOCH);

        tracker.finalize(&Accumulator::new(), Some(at(1_000))).await.unwrap();
        assert_eq!(tracker.previous().await.unwrap(), at(1_000));

        tracker.finalize(&Accumulator::new(), Some(at(500))).await.unwrap();
        assert_eq!(tracker.previous().await.unwrap(), at(1_000));
    }
}
