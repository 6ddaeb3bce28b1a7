//! Row decoding helpers shared by the catalog readers.

use crate::{Result, error::SchemaDocError};
use sqlx::Row;

/// Extension trait for extracting typed values from catalog rows with
/// consistent error context.
///
/// # Example
/// ```rust,ignore
/// let name: String = row.get_field("column_name", Some("orders"))?;
/// let comment: Option<String> = row.get_field("column_comment", Some("orders"))?;
/// ```
pub(crate) trait RowExt: Row {
    /// Extracts a typed field from the row, naming the field and table on
    /// failure.
    fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
    where
        T: sqlx::Decode<'r, Self::Database> + sqlx::Type<Self::Database>,
        for<'a> &'a str: sqlx::ColumnIndex<Self>,
    {
        self.try_get(field_name)
            .map_err(|e| SchemaDocError::parse_field(field_name, table_context, e))
    }
}

#[cfg(feature = "postgresql")]
impl RowExt for sqlx::postgres::PgRow {}

#[cfg(feature = "mysql")]
impl RowExt for sqlx::mysql::MySqlRow {}

/// MySQL-family catalogs disagree on column types: MySQL 8 reports
/// `information_schema` text as VARBINARY and counters as BIGINT UNSIGNED,
/// Doris and MariaDB use plain VARCHAR and signed BIGINT. These decoders
/// accept every variant.
#[cfg(feature = "mysql")]
pub(crate) mod mysql_lenient {
    use super::RowExt;
    use crate::{Result, error::SchemaDocError};
    use sqlx::{Row, mysql::MySqlRow};

    /// Decodes a nullable text column, accepting binary strings as UTF-8.
    pub(crate) fn text(row: &MySqlRow, field: &str, table: Option<&str>) -> Result<Option<String>> {
        if let Ok(value) = row.try_get::<Option<String>, _>(field) {
            return Ok(value);
        }
        let bytes: Option<Vec<u8>> = row.get_field(field, table)?;
        Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
    }

    /// Decodes a nullable integer column, signed or unsigned.
    pub(crate) fn integer(row: &MySqlRow, field: &str, table: Option<&str>) -> Result<Option<i64>> {
        if let Ok(value) = row.try_get::<Option<i64>, _>(field) {
            return Ok(value);
        }
        let unsigned: Option<u64> = row.get_field(field, table)?;
        unsigned
            .map(i64::try_from)
            .transpose()
            .map_err(|e| SchemaDocError::parse_field(field, table, e))
    }
}
