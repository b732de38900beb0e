//! Brings a citee's stored self-citations in line with a fresh detection.

use crate::RecordId;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use selfcites_cache::{CacheEntry, Changeset, Repository};
use std::collections::BTreeSet;
use time::UtcDateTime;

/// Relation rows written by one [`CacheDiffUpdater::reconcile`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub inserted: usize,
    pub deleted: usize,
}

impl Reconciled {
    pub fn writes(&self) -> usize {
        self.inserted + self.deleted
    }
}

/// Split the difference between the stored and the detected citers into
/// citers to insert and citers to delete.
pub fn diff(
    stored: &BTreeSet<RecordId>,
    detected: &BTreeSet<RecordId>,
) -> (BTreeSet<RecordId>, BTreeSet<RecordId>) {
    let insert = detected.difference(stored).copied().collect();
    let delete = stored.difference(detected).copied().collect();
    (insert, delete)
}

/// Persists detector output as a diff against what is already stored.
///
/// Only citers that appeared or disappeared are written; citers present on
/// both sides keep their original timestamp.
pub struct CacheDiffUpdater<'a> {
    repo: &'a Repository,
}

impl<'a> CacheDiffUpdater<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Store `citers` as the complete set of self-citations of `citee`.
    ///
    /// The entry (count, `references` snapshot, `at`) is replaced even when
    /// no relation row changes. The whole update commits atomically.
    pub async fn reconcile(
        &self,
        citee: RecordId,
        citers: &BTreeSet<RecordId>,
        references: &BTreeSet<RecordId>,
        at: UtcDateTime,
    ) -> Result<Reconciled> {
        let stored = self.repo.list_citers(citee).await.or_raise(|| ErrorKind::Cache)?;
        let (insert, delete) = diff(&stored, citers);
        for citer in &insert {
            tracing::debug!(citee, citer, "Adding self-citation");
        }
        for citer in &delete {
            tracing::debug!(citee, citer, "Deleting self-citation");
        }
        let reconciled = Reconciled { inserted: insert.len(), deleted: delete.len() };
        let entry = CacheEntry {
            citee,
            count: u64::try_from(citers.len()).unwrap_or(u64::MAX),
            references: references.iter().copied().collect(),
            last_updated: at,
        };
        self.repo.apply(&Changeset { insert, delete, entry }).await.or_raise(|| ErrorKind::Cache)?;
        Ok(reconciled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::at;
    use rstest::rstest;
    use selfcites_cache::Database;

    fn set(ids: &[RecordId]) -> BTreeSet<RecordId> {
        ids.iter().copied().collect()
    }

    #[rstest]
    #[case::replace_one(&[6, 7, 8], &[5, 6, 7], &[5], &[8])]
    #[case::from_empty(&[], &[1, 2], &[1, 2], &[])]
    #[case::to_empty(&[1, 2], &[], &[], &[1, 2])]
    #[case::unchanged(&[3, 4], &[3, 4], &[], &[])]
    #[case::disjoint(&[1, 2], &[3], &[3], &[1, 2])]
    fn test_diff(
        #[case] stored: &[RecordId],
        #[case] detected: &[RecordId],
        #[case] insert: &[RecordId],
        #[case] delete: &[RecordId],
    ) {
        let (i, d) = diff(&set(stored), &set(detected));
        assert_eq!(i, set(insert));
        assert_eq!(d, set(delete));
        // Writes equal the symmetric difference, never |O| + |N|.
        let symmetric: BTreeSet<_> = set(stored).symmetric_difference(&set(detected)).copied().collect();
        assert_eq!(i.len() + d.len(), symmetric.len());
    }

    #[tokio::test]
    async fn test_reconcile_replaces_changed_citers_only() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let updater = CacheDiffUpdater::new(&repo);

        let first = updater.reconcile(9, &set(&[6, 7, 8]), &set(&[1]), at(1_000)).await.unwrap();
        assert_eq!(first, Reconciled { inserted: 3, deleted: 0 });

        let second = updater.reconcile(9, &set(&[5, 6, 7]), &set(&[1, 2]), at(2_000)).await.unwrap();
        assert_eq!(second, Reconciled { inserted: 1, deleted: 1 });

        let citations = repo.list_citations(9).await.unwrap();
        let stamps: Vec<_> = citations.iter().map(|c| (c.citer, c.last_updated)).collect();
        assert_eq!(stamps, vec![(5, at(2_000)), (6, at(1_000)), (7, at(1_000))]);

        let entry = repo.get_entry(9).await.unwrap().unwrap();
        assert_eq!(entry.count, 3);
        assert_eq!(entry.references, vec![1, 2]);
        assert_eq!(entry.last_updated, at(2_000));
    }

    #[tokio::test]
    async fn test_reconcile_twice_is_a_no_op() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let updater = CacheDiffUpdater::new(&repo);

        updater.reconcile(9, &set(&[5, 6]), &set(&[]), at(1_000)).await.unwrap();
        let again = updater.reconcile(9, &set(&[5, 6]), &set(&[]), at(1_500)).await.unwrap();
        assert_eq!(again.writes(), 0);
        assert_eq!(repo.list_citers(9).await.unwrap(), set(&[5, 6]));
    }

    #[tokio::test]
    async fn test_reconcile_to_empty_keeps_zero_entry() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let updater = CacheDiffUpdater::new(&repo);

        updater.reconcile(9, &set(&[5]), &set(&[]), at(1_000)).await.unwrap();
        let reconciled = updater.reconcile(9, &set(&[]), &set(&[]), at(2_000)).await.unwrap();
        assert_eq!(reconciled, Reconciled { inserted: 0, deleted: 1 });
        assert!(repo.list_citers(9).await.unwrap().is_empty());
        assert_eq!(repo.get_entry(9).await.unwrap().unwrap().count, 0);
    }
}
