use super::{id_from_sql, time_from_sql};
use crate::Citation;
use crate::error::Error;

#[derive(sqlx::FromRow)]
pub(crate) struct RelationRow {
    citee: i64,
    citer: i64,
    last_updated: i64,
}
impl TryFrom<RelationRow> for Citation {
    type Error = Error;
    fn try_from(row: RelationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            citee: id_from_sql(row.citee)?,
            citer: id_from_sql(row.citer)?,
            last_updated: time_from_sql(row.last_updated)?,
        })
    }
}
