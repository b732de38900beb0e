mod entry;
mod relation;

pub(crate) use self::entry::EntryRow;
pub(crate) use self::relation::RelationRow;

use crate::RecordId;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::UtcDateTime;

// SQLite only has signed 64-bit integers.
pub(crate) fn id_to_sql(id: RecordId) -> Result<i64> {
    i64::try_from(id).or_raise(|| ErrorKind::InvalidData("record id"))
}

pub(crate) fn id_from_sql(id: i64) -> Result<RecordId> {
    RecordId::try_from(id).or_raise(|| ErrorKind::InvalidData("record id"))
}

pub(crate) fn time_from_sql(timestamp: i64) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp(timestamp).or_raise(|| ErrorKind::InvalidData("timestamp"))
}
