//! Repository for self-citation entries, relation rows, watermarks and
//! method data.
//!
//! Entries and relation rows are tightly coupled: the relation rows of a
//! citee are only ever written together with its entry, in one transaction,
//! so a reader never sees a citee whose count disagrees with its citers.

use crate::error::{ErrorKind, Result};
use crate::models::{EntryRow, RelationRow, id_from_sql, id_to_sql, time_from_sql};
use crate::{CacheEntry, Changeset, Citation, Database, RecordId};
use exn::ResultExt;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, BTreeSet};
use time::UtcDateTime;

/// Repository for managing the self-citation cache.
///
/// # Relationships
///
/// - Each citee has at most one entry.
/// - A citee's relation rows mirror the last computed set of self-citing
///   records; the entry's `count` is the size of that set.
/// - Watermarks and method data are keyed by method name and are independent
///   of any single citee.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    // =========================================================================
    // Entries
    // =========================================================================

    /// Get the cached entry for a citee.
    pub async fn get_entry(&self, citee: RecordId) -> Result<Option<CacheEntry>> {
        let row: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_entry.sql"))
            .bind(id_to_sql(citee)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| r.try_into()).transpose()
    }

    /// Count all cached entries.
    pub async fn count_entries(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_entries.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }

    // =========================================================================
    // Relation
    // =========================================================================

    /// List the stored self-citations of a citee, ordered by citer.
    pub async fn list_citations(&self, citee: RecordId) -> Result<Vec<Citation>> {
        let rows: Vec<RelationRow> = sqlx::query_as(include_str!("../queries/list_relation_for_citee.sql"))
            .bind(id_to_sql(citee)?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// The set of citers currently stored for a citee.
    pub async fn list_citers(&self, citee: RecordId) -> Result<BTreeSet<RecordId>> {
        Ok(self.list_citations(citee).await?.into_iter().map(|c| c.citer).collect())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Apply one citee's changeset atomically.
    ///
    /// New citers are stamped with the entry's `last_updated`; citers not
    /// mentioned in the changeset are not touched. The entry is replaced
    /// whether or not any relation row changed.
    pub async fn apply(&self, changes: &Changeset) -> Result<()> {
        let entry = EntryRow::try_from(&changes.entry)?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for citer in &changes.insert {
            sqlx::query(include_str!("../queries/insert_citer.sql"))
                .bind(entry.citee)
                .bind(id_to_sql(*citer)?)
                .bind(entry.last_updated)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for citer in &changes.delete {
            sqlx::query(include_str!("../queries/delete_citer.sql"))
                .bind(entry.citee)
                .bind(id_to_sql(*citer)?)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        sqlx::query(include_str!("../queries/replace_entry.sql"))
            .bind(entry.citee)
            .bind(entry.count)
            .bind(&entry.refs)
            .bind(entry.last_updated)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Empty every entry, every relation row, and the named method's data.
    ///
    /// The method's watermark survives: it is only ever raised.
    pub async fn truncate(&self, method: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query("DELETE FROM selfcite_relation").execute(&mut *tx).await.or_raise(|| ErrorKind::Database)?;
        sqlx::query("DELETE FROM selfcite_entries").execute(&mut *tx).await.or_raise(|| ErrorKind::Database)?;
        sqlx::query("DELETE FROM selfcite_method_data WHERE name = ?")
            .bind(method)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(method, "Truncated self-citation cache");
        Ok(())
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// The stored watermark of a method, if it has ever completed a pass.
    pub async fn watermark(&self, method: &str) -> Result<Option<UtcDateTime>> {
        let timestamp: Option<i64> = sqlx::query_scalar(include_str!("../queries/get_watermark.sql"))
            .bind(method)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        timestamp.map(time_from_sql).transpose()
    }

    /// Load the method's citee -> count dictionary (empty if never stored).
    pub async fn load_method_counts(&self, method: &str) -> Result<BTreeMap<RecordId, u64>> {
        let counts: Option<String> = sqlx::query_scalar(include_str!("../queries/get_method_data.sql"))
            .bind(method)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match counts {
            Some(json) => serde_json::from_str(&json).or_raise(|| ErrorKind::InvalidData("method data")),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Replace the method's count dictionary and, if given, raise its
    /// watermark, in a single transaction.
    ///
    /// A watermark older than the stored one is ignored rather than
    /// lowering it.
    pub async fn store_method(
        &self,
        method: &str,
        counts: &BTreeMap<RecordId, u64>,
        watermark: Option<UtcDateTime>,
    ) -> Result<()> {
        let json = serde_json::to_string(counts).or_raise(|| ErrorKind::InvalidData("method data"))?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/replace_method_data.sql"))
            .bind(method)
            .bind(json)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if let Some(watermark) = watermark {
            sqlx::query(include_str!("../queries/advance_watermark.sql"))
                .bind(method)
                .bind(watermark.unix_timestamp())
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// List the citees that have an entry, ascending.
    pub async fn list_citees(&self) -> Result<Vec<RecordId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT citee FROM selfcite_entries ORDER BY citee")
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        ids.into_iter().map(id_from_sql).collect()
    }
}
