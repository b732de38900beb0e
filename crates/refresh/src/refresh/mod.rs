//! Refresh passes over the self-citation cache.
//!
//! A [`Refresher`] runs one of two passes:
//! - [`rebuild`](Refresher::rebuild): empty the cache and compute every
//!   record from scratch.
//! - [`incremental`](Refresher::incremental): recompute the records touched
//!   since the last pass (or an explicit id list), skipping whatever the
//!   [`StalenessOracle`] says is still fresh.
//!
//! Both passes commit every record on its own and only advance the watermark
//! once every record succeeded, so a failed or cancelled pass leaves a valid
//! cache that is merely behind.

mod incremental;
mod rebuild;

use crate::RecordId;
use crate::accumulator::Accumulator;
use crate::error::{ErrorKind, Result};
use crate::pacing::{Control, Pacer, Phase, Progress};
use crate::reconcile::CacheDiffUpdater;
use crate::staleness::{Freshness, StalenessOracle};
use crate::upstream::{AuthorIdentityLog, SelfCiteDetector, Upstream};
use crate::watermark::WatermarkTracker;
use derive_more::Display;
use exn::ResultExt;
use selfcites_cache::Repository;
use selfcites_config::MethodConfig;
use std::collections::BTreeSet;
use time::UtcDateTime;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[display("rebuild")]
    Rebuild,
    #[display("incremental")]
    Incremental,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Every record was handled and the counts were flushed.
    #[display("completed")]
    Completed,
    /// The pacer asked to stop; nothing was flushed.
    #[display("cancelled")]
    Cancelled,
}

/// What a pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub mode: Mode,
    pub status: Status,
    /// Records the pass set out to handle (`None` for a rebuild, which
    /// streams its ids).
    pub total: Option<usize>,
    /// Records handled (for incremental passes: candidates, each together
    /// with its references).
    pub processed: usize,
    /// Records recomputed by the detector.
    pub computed: usize,
    /// Records whose cached entry was still fresh.
    pub fresh: usize,
    /// Records skipped because the record store doesn't know them.
    pub missing: usize,
    /// Relation rows inserted.
    pub inserted: usize,
    /// Relation rows deleted.
    pub deleted: usize,
    /// Watermark stored at the end of the pass, if any.
    pub watermark: Option<UtcDateTime>,
}

impl PassReport {
    fn new(mode: Mode, total: Option<usize>) -> Self {
        Self {
            mode,
            status: Status::Completed,
            total,
            processed: 0,
            computed: 0,
            fresh: 0,
            missing: 0,
            inserted: 0,
            deleted: 0,
            watermark: None,
        }
    }
}

/// Runs refresh passes for one method against one cache.
pub struct Refresher<'a> {
    repo: &'a Repository,
    upstream: &'a Upstream,
    method: &'a MethodConfig,
}

impl<'a> Refresher<'a> {
    pub fn new(repo: &'a Repository, upstream: &'a Upstream, method: &'a MethodConfig) -> Self {
        Self { repo, upstream, method }
    }

    fn detector(&self) -> &'a dyn SelfCiteDetector {
        self.upstream.detectors.select(self.method.algorithm)
    }

    fn watermarks(&self) -> WatermarkTracker<'a> {
        let identities = match self.method.use_author_identity {
            true => Some(self.upstream.identities.as_ref() as &dyn AuthorIdentityLog),
            false => None,
        };
        WatermarkTracker::new(self.repo, &self.method.name, self.upstream.citations.as_ref(), identities)
    }

    fn pass(&self, mode: Mode, total: Option<usize>, accumulator: Accumulator) -> Pass<'a> {
        Pass {
            method: self.method,
            upstream: self.upstream,
            detector: self.detector(),
            oracle: StalenessOracle::new(self.repo, self.upstream.records.as_ref(), self.upstream.citations.as_ref()),
            updater: CacheDiffUpdater::new(self.repo),
            accumulator,
            report: PassReport::new(mode, total),
        }
    }
}

/// State of one running pass.
struct Pass<'a> {
    method: &'a MethodConfig,
    upstream: &'a Upstream,
    detector: &'a dyn SelfCiteDetector,
    oracle: StalenessOracle<'a>,
    updater: CacheDiffUpdater<'a>,
    accumulator: Accumulator,
    report: PassReport,
}

impl Pass<'_> {
    /// Hand progress to the pacer every `batch_size` records.
    ///
    /// Returns `false` if the pass must stop.
    async fn checkpoint(&mut self, pacer: &dyn Pacer, phase: Phase, done: usize) -> bool {
        if done % self.method.batch_size.get() != 0 {
            return true;
        }
        let progress = Progress { phase, done, total: self.report.total };
        tracing::info!(method = %self.method.name, %progress, "Progress");
        match pacer.checkpoint(&progress).await {
            Control::Continue => true,
            Control::Cancel => {
                tracing::warn!(method = %self.method.name, %progress, "Pass cancelled");
                self.report.status = Status::Cancelled;
                false
            },
        }
    }

    /// Bring one record's cache entry up to date and return its current
    /// references.
    ///
    /// With `check_freshness`, a record the oracle reports fresh keeps its
    /// entry (its cached count still goes into the accumulator) and a record
    /// unknown to the record store is skipped.
    async fn refresh_record(&mut self, record: RecordId, check_freshness: bool) -> Result<BTreeSet<RecordId>> {
        let references = self.upstream.citations.references(record).await.or_raise(|| ErrorKind::CitationGraph)?;
        if check_freshness {
            match self.oracle.assess(record, &references).await? {
                Freshness::Fresh { count } => {
                    tracing::debug!(record, count, "Self-citations found (cached)");
                    self.accumulator.record(record, count);
                    self.report.fresh += 1;
                    return Ok(references);
                },
                Freshness::NotFound => {
                    tracing::warn!(record, "Record not found; skipping");
                    self.report.missing += 1;
                    return Ok(references);
                },
                Freshness::Stale => {},
            }
        }
        let citers = self
            .detector
            .detect(record, &self.method.author_tags)
            .await
            .or_raise(|| ErrorKind::Detector(record))?;
        let reconciled = self.updater.reconcile(record, &citers, &references, UtcDateTime::now()).await?;
        tracing::debug!(record, count = citers.len(), "Self-citations found");
        self.accumulator.record(record, u64::try_from(citers.len()).unwrap_or(u64::MAX));
        self.report.computed += 1;
        self.report.inserted += reconciled.inserted;
        self.report.deleted += reconciled.deleted;
        Ok(references)
    }
}
