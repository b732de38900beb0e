use super::{id_from_sql, id_to_sql, time_from_sql};
use crate::CacheEntry;
use crate::RecordId;
use crate::error::{Error, ErrorKind};
use exn::ResultExt;

#[derive(sqlx::FromRow)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct EntryRow {
    pub(crate) citee: i64,
    pub(crate) count: i64,
    /// JSON array of record ids.
    pub(crate) refs: String,
    pub(crate) last_updated: i64,
}
impl TryFrom<&CacheEntry> for EntryRow {
    type Error = Error;
    fn try_from(entry: &CacheEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            citee: id_to_sql(entry.citee)?,
            count: i64::try_from(entry.count).or_raise(|| ErrorKind::InvalidData("count"))?,
            refs: serde_json::to_string(&entry.references).or_raise(|| ErrorKind::InvalidData("references"))?,
            last_updated: entry.last_updated.unix_timestamp(),
        })
    }
}
impl TryFrom<EntryRow> for CacheEntry {
    type Error = Error;
    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            citee: id_from_sql(row.citee)?,
            count: u64::try_from(row.count).or_raise(|| ErrorKind::InvalidData("count"))?,
            references: serde_json::from_str::<Vec<RecordId>>(&row.refs)
                .or_raise(|| ErrorKind::InvalidData("references"))?,
            last_updated: time_from_sql(row.last_updated)?,
        })
    }
}
