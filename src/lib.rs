//! Incrementally maintained self-citation cache.
//!
//! For every cited record, the cache keeps the set of citing records that
//! share its authorship, and brings that set up to date with as little work
//! as possible when records, citations or author identities change.
//!
//! [`SelfCites`] ties the pieces together: it loads the [`Config`], opens the
//! cache database and runs refresh passes against a host-provided
//! [`Upstream`]. The building blocks live in their own crates and are
//! re-exported here:
//! - [`cache`]: the SQLite cache database.
//! - [`config`]: configuration loading.
//! - [`refresh`]: the refresh passes and the upstream interfaces.

pub mod error;

pub use selfcites_cache as cache;
pub use selfcites_config as config;
pub use selfcites_refresh as refresh;

pub use selfcites_cache::{Database, RecordId, Repository};
pub use selfcites_config::Config;
pub use selfcites_refresh::{Pacer, PassReport, Status, Upstream};

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use selfcites_refresh::Refresher;
use std::ops::RangeInclusive;
use std::path::Path;

/// A configured self-citation cache, ready to be refreshed.
pub struct SelfCites {
    config: Config,
    db: Database,
    repo: Repository,
    upstream: Upstream,
}

impl SelfCites {
    /// Load the configuration file at `path` and open the cache it names.
    ///
    /// Configuration errors are reported before the database is touched.
    pub async fn from_config_file(path: impl AsRef<Path>, upstream: Upstream) -> Result<Self> {
        let config = Config::load(path).or_raise(|| ErrorKind::Configuration)?;
        Self::open(config, upstream).await
    }

    /// Open (creating if needed) the cache database named by `config`.
    pub async fn open(config: Config, upstream: Upstream) -> Result<Self> {
        let path = &config.database.path;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Cache)?;
        }
        let db = Database::connect(path).await.or_raise(|| ErrorKind::Cache)?;
        tracing::info!(path = %path.display(), method = %config.method.name, "Opened self-citation cache");
        let repo = Repository::from(&db);
        Ok(Self { config, db, repo, upstream })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read access to the cache, for inspection.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Run an incremental pass.
    ///
    /// With no `ranges` the pass covers everything modified since the last
    /// one; otherwise exactly the given ids, without moving the watermark.
    pub async fn run(&self, ranges: &[RangeInclusive<RecordId>], pacer: &dyn Pacer) -> Result<PassReport> {
        self.refresher().incremental(ranges, pacer).await.or_raise(|| ErrorKind::Refresh)
    }

    /// Empty the cache and compute every record from scratch.
    pub async fn rebuild(&self, pacer: &dyn Pacer) -> Result<PassReport> {
        self.refresher().rebuild(pacer).await.or_raise(|| ErrorKind::Refresh)
    }

    /// Close the cache database.
    pub async fn close(self) {
        self.db.close().await;
    }

    fn refresher(&self) -> Refresher<'_> {
        Refresher::new(&self.repo, &self.upstream, &self.config.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use selfcites_refresh::Unpaced;
    use selfcites_refresh::mock::{MemoryDetector, MemoryUpstream, at};
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn upstream() -> Upstream {
        let records = MemoryUpstream::default()
            .with_record(1, at(100))
            .with_record(2, at(200))
            .with_references(2, [1])
            .with_last_indexed(at(1_000))
            .with_identity_update(at(1_000));
        let simple = MemoryDetector::default().with_result(1, [2]);
        Arc::new(records).into_upstream(Arc::new(simple), Arc::new(MemoryDetector::default()))
    }

    fn write_config(dir: &TempDir, algorithm: &str) -> std::path::PathBuf {
        let path = dir.path().join("selfcites.toml");
        let database = dir.path().join("nested").join("cache.sqlite");
        let toml = format!(
            "[method]\nalgorithm = \"{algorithm}\"\nfriends_threshold = 10\n\n[database]\npath = {:?}\n",
            database.display().to_string()
        );
        std::fs::write(&path, toml).unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_config_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let result = SelfCites::from_config_file(dir.path().join("missing.toml"), upstream()).await;
        let Err(err) = result else { panic!("expected a configuration error") };
        assert!(matches!(&*err, ErrorKind::Configuration));
        assert!(!err.is_retryable());
        assert!(!dir.path().join("nested").exists());
    }

    #[rstest]
    #[case::unknown("coauthors")]
    #[case::empty("")]
    #[case::wrong_case("Simple")]
    #[tokio::test]
    async fn test_invalid_algorithm_is_rejected(#[case] algorithm: &str) {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, algorithm);
        let Err(err) = SelfCites::from_config_file(path, upstream()).await else {
            panic!("expected a configuration error")
        };
        assert!(matches!(&*err, ErrorKind::Configuration));
    }

    #[tokio::test]
    async fn test_run_then_rebuild() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "simple");
        let selfcites = SelfCites::from_config_file(path, upstream()).await.unwrap();
        assert!(dir.path().join("nested").join("cache.sqlite").is_file());

        let report = selfcites.run(&[], &Unpaced).await.unwrap();
        assert_eq!(report.status, Status::Completed);
        assert_eq!(report.watermark, Some(at(1_000)));
        let repo = selfcites.repository();
        assert_eq!(repo.list_citers(1).await.unwrap(), BTreeSet::from([2]));

        let report = selfcites.rebuild(&Unpaced).await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(repo.list_citees().await.unwrap(), vec![1, 2]);
        assert!(repo.watermark(&selfcites.config().method.name).await.unwrap().unwrap() >= at(1_000));
        selfcites.close().await;
    }
}
