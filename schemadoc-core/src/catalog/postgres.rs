//! `pg_catalog` reader for Postgres-family engines (PostgreSQL, Kingbase).
//!
//! Primary-key membership is read from `pg_index.indisprimary`; a NOT NULL
//! column is not reported as a key unless a primary-key index covers it.

use super::helpers::RowExt;
use super::{CatalogReader, connect_with_timeout, normalize_url};
use crate::{
    Result,
    config::ExportConfig,
    error::SchemaDocError,
    models::{ColumnMeta, Dialect, TableMeta},
};
use async_trait::async_trait;
use sqlx::Connection;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use std::str::FromStr;

/// Ordinary and partitioned tables of a schema; `$2` admits views and
/// materialized views. Partitions are documented through their parent.
const TABLES_QUERY: &str = r#"
    SELECT
        c.relname::text AS table_name,
        obj_description(c.oid, 'pg_class') AS table_comment
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
    AND (c.relkind IN ('r', 'p') OR ($2 AND c.relkind IN ('v', 'm')))
    AND NOT c.relispartition
    ORDER BY c.relname
"#;

/// Live columns of one table. `atttypmod` carries the declared length plus
/// a 4-byte header for character types only.
const COLUMNS_QUERY: &str = r#"
    SELECT
        a.attname::text AS column_name,
        pg_catalog.format_type(a.atttypid, a.atttypmod) AS column_type,
        pg_catalog.col_description(a.attrelid, a.attnum) AS column_comment,
        a.attnum::int4 AS ordinal_position,
        CASE
            WHEN a.atttypid IN ('pg_catalog.varchar'::regtype::oid, 'pg_catalog.bpchar'::regtype::oid)
                AND a.atttypmod > 0
            THEN (a.atttypmod - 4)::int8
            ELSE NULL
        END AS max_length,
        EXISTS (
            SELECT 1
            FROM pg_catalog.pg_index i
            WHERE i.indrelid = a.attrelid
            AND i.indisprimary
            AND a.attnum = ANY (i.indkey)
        ) AS is_primary_key
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
    AND c.relname = $2
    AND a.attnum > 0
    AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

const SCHEMA_EXISTS_QUERY: &str =
    "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1) AS schema_exists";

/// Catalog reader over a single Postgres-protocol connection.
pub struct PostgresCatalog {
    conn: Option<PgConnection>,
    include_views: bool,
}

impl std::fmt::Debug for PostgresCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresCatalog")
            .field("open", &self.conn.is_some())
            .field("include_views", &self.include_views)
            .finish()
    }
}

impl PostgresCatalog {
    /// Connects using the URL and credentials in `config`.
    ///
    /// # Errors
    /// Returns a configuration error if the URL cannot be parsed, and a
    /// connection error if the server is unreachable, rejects the login, or
    /// does not answer within the connect timeout.
    pub async fn connect(config: &ExportConfig) -> Result<Self> {
        let options = connect_options(config)?;
        let conn = connect_with_timeout(config, PgConnection::connect_with(&options)).await?;

        tracing::info!("Connected to Postgres-family catalog at {}", config.redacted_url());
        Ok(Self {
            conn: Some(conn),
            include_views: config.include_views,
        })
    }

    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.conn.as_mut().ok_or_else(|| {
            SchemaDocError::connection_failed(
                "PostgreSQL catalog connection is closed",
                std::io::Error::from(std::io::ErrorKind::NotConnected),
            )
        })
    }
}

/// Builds driver options from configuration; explicit credentials replace
/// any user or password embedded in the URL.
pub fn connect_options(config: &ExportConfig) -> Result<PgConnectOptions> {
    let url = normalize_url(&config.url, Dialect::Postgres)?;
    let mut options = PgConnectOptions::from_str(&url).map_err(|e| {
        SchemaDocError::configuration(format!(
            "Invalid PostgreSQL connection URL '{}': {}",
            config.redacted_url(),
            e
        ))
    })?;

    if let Some(username) = config.credentials.username() {
        options = options.username(username);
    }
    if let Some(password) = config.credentials.password() {
        options = options.password(password);
    }
    Ok(options.application_name("schemadoc"))
}

#[async_trait]
impl CatalogReader for PostgresCatalog {
    async fn test_connection(&mut self) -> Result<()> {
        let conn = self.conn()?;

        conn.ping()
            .await
            .map_err(|e| SchemaDocError::connection_failed("Connectivity check failed", e))?;

        sqlx::query("SELECT 1 FROM pg_catalog.pg_class LIMIT 1")
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| SchemaDocError::query_failed("Cannot access pg_catalog.pg_class", e))?;

        Ok(())
    }

    async fn schema_exists(&mut self, schema: &str) -> Result<bool> {
        let row = sqlx::query(SCHEMA_EXISTS_QUERY)
            .bind(schema)
            .fetch_one(self.conn()?)
            .await
            .map_err(|e| {
                SchemaDocError::query_failed(format!("Failed to look up schema '{}'", schema), e)
            })?;

        row.get_field("schema_exists", None)
    }

    async fn list_tables(&mut self, schema: &str) -> Result<Vec<TableMeta>> {
        let include_views = self.include_views;
        let rows = sqlx::query(TABLES_QUERY)
            .bind(schema)
            .bind(include_views)
            .fetch_all(self.conn()?)
            .await
            .map_err(|e| {
                SchemaDocError::query_failed(
                    format!("Failed to enumerate tables in schema '{}'", schema),
                    e,
                )
            })?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.get_field("table_name", None)?;
            let comment: Option<String> = row.get_field("table_comment", Some(name.as_str()))?;
            tables.push(TableMeta::new(name, comment));
        }

        tracing::debug!("Schema '{}' has {} tables", schema, tables.len());
        Ok(tables)
    }

    async fn list_columns(&mut self, schema: &str, table: &str) -> Result<Vec<ColumnMeta>> {
        let rows = sqlx::query(COLUMNS_QUERY)
            .bind(schema)
            .bind(table)
            .fetch_all(self.conn()?)
            .await
            .map_err(|e| {
                SchemaDocError::query_failed(
                    format!("Failed to collect columns for table '{}.{}'", schema, table),
                    e,
                )
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let ctx = Some(table);
            let ordinal: i32 = row.get_field("ordinal_position", ctx)?;
            let comment: Option<String> = row.get_field("column_comment", ctx)?;

            columns.push(ColumnMeta {
                name: row.get_field("column_name", ctx)?,
                type_decl: row.get_field("column_type", ctx)?,
                comment: comment.unwrap_or_default(),
                ordinal_position: u32::try_from(ordinal)
                    .map_err(|e| SchemaDocError::parse_field("ordinal_position", ctx, e))?,
                max_length: row.get_field("max_length", ctx)?,
                is_primary_key: row.get_field("is_primary_key", ctx)?,
            });
        }

        tracing::trace!("Table '{}.{}' has {} columns", schema, table, columns.len());
        Ok(columns)
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| SchemaDocError::connection_failed("Failed to close connection", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartialConfig;

    fn config(url: &str, user: Option<&str>) -> ExportConfig {
        PartialConfig {
            url: Some(url.to_string()),
            user: user.map(str::to_string),
            password: Some("secret".to_string()),
            schema: Some("public".to_string()),
            ..Default::default()
        }
        .resolve()
        .unwrap()
    }

    #[test]
    fn test_connect_options_from_kingbase_jdbc_url() {
        let options = connect_options(&config("jdbc:kingbase8://kb.internal:54321/biz", None))
            .unwrap();
        assert_eq!(options.get_host(), "kb.internal");
        assert_eq!(options.get_port(), 54321);
        assert_eq!(options.get_database(), Some("biz"));
    }

    #[test]
    fn test_explicit_user_overrides_url_user() {
        let options =
            connect_options(&config("postgres://url_user@localhost/app", Some("reader"))).unwrap();
        assert_eq!(options.get_username(), "reader");
    }

    #[test]
    fn test_partitions_are_not_listed_as_tables() {
        assert!(TABLES_QUERY.contains("NOT c.relispartition"));
        assert!(TABLES_QUERY.contains("'p'"));
    }

    #[test]
    fn test_primary_key_comes_from_index_metadata() {
        assert!(COLUMNS_QUERY.contains("indisprimary"));
        assert!(!COLUMNS_QUERY.contains("attnotnull"));
        assert!(COLUMNS_QUERY.contains("ORDER BY a.attnum"));
    }

    #[tokio::test]
    async fn test_closed_reader_reports_connection_error() {
        let mut catalog = PostgresCatalog {
            conn: None,
            include_views: false,
        };
        let err = catalog.list_columns("public", "users").await.unwrap_err();
        assert_eq!(err.exit_code(), crate::error::ExitCode::Connection);
    }
}
