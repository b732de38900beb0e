use super::{Mode, PassReport, Refresher};
use crate::accumulator::Accumulator;
use crate::error::{ErrorKind, Result};
use crate::pacing::{Pacer, Phase};
use crate::upstream::DetectionContext;
use exn::ResultExt;
use futures::TryStreamExt;
use time::UtcDateTime;

impl Refresher<'_> {
    /// Throw the cache away and compute every record again.
    ///
    /// The watermark is set to the time the pass started, so records
    /// modified while it ran are picked up by the next incremental pass.
    #[tracing::instrument(skip_all, fields(method = %self.method.name, algorithm = %self.method.algorithm))]
    pub async fn rebuild(&self, pacer: &dyn Pacer) -> Result<PassReport> {
        let started = UtcDateTime::now();
        tracing::info!("Starting rebuild");

        self.repo.truncate(&self.method.name).await.or_raise(|| ErrorKind::Cache)?;
        let detector = self.detector();
        detector.reset().await.or_raise(|| ErrorKind::DetectorIndexes)?;

        let mut pass = self.pass(Mode::Rebuild, None, Accumulator::new());

        if detector.requires_prepass() {
            let context = DetectionContext {
                algorithm: self.method.algorithm,
                friends_threshold: self.method.friends_threshold,
                tags: &self.method.author_tags,
            };
            let mut ids = self.upstream.records.all_record_ids();
            let mut done = 0;
            while let Some(record) = ids.try_next().await.or_raise(|| ErrorKind::RecordStore)? {
                if !pass.checkpoint(pacer, Phase::Prepass, done).await {
                    return Ok(pass.report);
                }
                detector.prepare(record, &context).await.or_raise(|| ErrorKind::DetectorIndexes)?;
                done += 1;
            }
            tracing::info!(records = done, "Pre-pass finished");
        }

        let mut ids = self.upstream.records.all_record_ids();
        while let Some(record) = ids.try_next().await.or_raise(|| ErrorKind::RecordStore)? {
            let done = pass.report.processed;
            if !pass.checkpoint(pacer, Phase::Rebuild, done).await {
                return Ok(pass.report);
            }
            pass.refresh_record(record, false).await?;
            pass.report.processed += 1;
        }

        self.watermarks().finalize(&pass.accumulator, Some(started)).await?;
        pass.report.watermark = Some(started);
        tracing::info!(
            processed = pass.report.processed,
            inserted = pass.report.inserted,
            "Rebuild finished"
        );
        Ok(pass.report)
    }
}
