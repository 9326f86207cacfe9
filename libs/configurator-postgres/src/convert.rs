//! Conversions between the wire types (`u64` versions) and the SQL types that store them
//! (`BIGINT`, i.e. `i64`).

pub(crate) fn version_from_sql(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}
