use super::{Mode, PassReport, Refresher};
use crate::RecordId;
use crate::accumulator::Accumulator;
use crate::error::{ErrorKind, Result};
use crate::pacing::{Pacer, Phase};
use exn::ResultExt;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use time::UtcDateTime;

impl Refresher<'_> {
    /// Catch the cache up with upstream changes.
    ///
    /// With no `ranges`, the candidates are the records modified since the
    /// stored watermark, up to the safe boundary, and the watermark moves to
    /// that boundary once the pass completes. Otherwise the candidates are
    /// every id in the given (inclusive) ranges and the watermark stays put.
    ///
    /// Each candidate is refreshed together with every record it references;
    /// entries the [`StalenessOracle`](crate::staleness::StalenessOracle)
    /// reports fresh are kept as they are.
    #[tracing::instrument(skip_all, fields(method = %self.method.name, algorithm = %self.method.algorithm))]
    pub async fn incremental(&self, ranges: &[RangeInclusive<RecordId>], pacer: &dyn Pacer) -> Result<PassReport> {
        let tracker = self.watermarks();
        let (candidates, previous, watermark) = match ranges {
            [] => {
                let previous = tracker.previous().await?;
                let boundary = tracker.compute_safe_boundary().await?;
                (self.modified_within(previous, boundary).await?, Some(previous), Some(boundary.max(previous)))
            },
            ranges => (ranges.iter().cloned().flatten().collect(), None, None),
        };
        if candidates.is_empty() && previous.is_some() && watermark == previous {
            tracing::info!("Nothing to refresh");
            let mut report = PassReport::new(Mode::Incremental, Some(0));
            report.watermark = watermark;
            return Ok(report);
        }
        tracing::info!(candidates = candidates.len(), "Starting incremental pass");

        let counts = self.repo.load_method_counts(&self.method.name).await.or_raise(|| ErrorKind::Cache)?;
        let mut pass = self.pass(Mode::Incremental, Some(candidates.len()), Accumulator::from(counts));

        for (done, &candidate) in candidates.iter().enumerate() {
            if !pass.checkpoint(pacer, Phase::Incremental, done).await {
                return Ok(pass.report);
            }
            let references = pass.refresh_record(candidate, true).await?;
            for reference in references {
                pass.refresh_record(reference, true).await?;
            }
            pass.report.processed += 1;
        }

        tracker.finalize(&pass.accumulator, watermark).await?;
        pass.report.watermark = watermark;
        tracing::info!(
            processed = pass.report.processed,
            computed = pass.report.computed,
            fresh = pass.report.fresh,
            missing = pass.report.missing,
            "Incremental pass finished"
        );
        Ok(pass.report)
    }

    async fn modified_within(&self, previous: UtcDateTime, boundary: UtcDateTime) -> Result<BTreeSet<RecordId>> {
        if boundary <= previous {
            tracing::info!(%previous, %boundary, "Upstream has not moved past the watermark");
            return Ok(BTreeSet::new());
        }
        self.upstream.records.modified_within(previous, boundary).await.or_raise(|| ErrorKind::RecordStore)
    }
}
