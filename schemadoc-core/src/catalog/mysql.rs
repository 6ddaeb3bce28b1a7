//! `information_schema` reader for MySQL-family engines (MySQL, MariaDB,
//! Apache Doris).
//!
//! # Security Guarantees
//! - Read-only catalog SELECTs with bound parameters
//! - Connection URL redacted in every error and log line

use super::helpers::mysql_lenient;
use super::{CatalogReader, connect_with_timeout, normalize_url};
use crate::{
    Result,
    config::ExportConfig,
    error::SchemaDocError,
    models::{ColumnMeta, Dialect, TableMeta},
};
use async_trait::async_trait;
use sqlx::Connection;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use std::str::FromStr;

/// Base tables of a schema; the second parameter admits views.
///
/// Text columns are cast to CHAR because MySQL 8 exposes them as VARBINARY.
const TABLES_QUERY: &str = r#"
    SELECT
        CAST(TABLE_NAME AS CHAR) AS TABLE_NAME,
        CAST(TABLE_COMMENT AS CHAR) AS TABLE_COMMENT
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = ?
    AND (TABLE_TYPE = 'BASE TABLE' OR ?)
    ORDER BY TABLE_NAME
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        CAST(COLUMN_NAME AS CHAR) AS COLUMN_NAME,
        CAST(COLUMN_TYPE AS CHAR) AS COLUMN_TYPE,
        CAST(COLUMN_COMMENT AS CHAR) AS COLUMN_COMMENT,
        ORDINAL_POSITION,
        CHARACTER_MAXIMUM_LENGTH,
        CAST(COLUMN_KEY AS CHAR) AS COLUMN_KEY
    FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = ?
    AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

const SCHEMA_EXISTS_QUERY: &str = r#"
    SELECT COUNT(*) AS schema_count
    FROM information_schema.SCHEMATA
    WHERE SCHEMA_NAME = ?
"#;

/// `COLUMN_KEY` value marking primary-key membership.
const PRIMARY_KEY: &str = "PRI";

/// Catalog reader over a single MySQL-protocol connection.
pub struct MySqlCatalog {
    conn: Option<MySqlConnection>,
    include_views: bool,
}

impl std::fmt::Debug for MySqlCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlCatalog")
            .field("open", &self.conn.is_some())
            .field("include_views", &self.include_views)
            .finish()
    }
}

impl MySqlCatalog {
    /// Connects using the URL and credentials in `config`.
    ///
    /// # Errors
    /// Returns a configuration error if the URL cannot be parsed, and a
    /// connection error if the server is unreachable, rejects the login, or
    /// does not answer within the connect timeout.
    pub async fn connect(config: &ExportConfig) -> Result<Self> {
        let options = connect_options(config)?;
        let conn = connect_with_timeout(config, MySqlConnection::connect_with(&options)).await?;

        tracing::info!("Connected to MySQL-family catalog at {}", config.redacted_url());
        Ok(Self {
            conn: Some(conn),
            include_views: config.include_views,
        })
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection> {
        self.conn.as_mut().ok_or_else(|| {
            SchemaDocError::connection_failed(
                "MySQL catalog connection is closed",
                std::io::Error::from(std::io::ErrorKind::NotConnected),
            )
        })
    }
}

/// Builds driver options from configuration; explicit credentials replace
/// any user or password embedded in the URL.
pub fn connect_options(config: &ExportConfig) -> Result<MySqlConnectOptions> {
    let url = normalize_url(&config.url, Dialect::MySql)?;
    let mut options = MySqlConnectOptions::from_str(&url).map_err(|e| {
        SchemaDocError::configuration(format!(
            "Invalid MySQL connection URL '{}': {}",
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
    Ok(options)
}

#[async_trait]
impl CatalogReader for MySqlCatalog {
    async fn test_connection(&mut self) -> Result<()> {
        let conn = self.conn()?;

        conn.ping()
            .await
            .map_err(|e| SchemaDocError::connection_failed("Connectivity check failed", e))?;

        sqlx::query("SELECT COUNT(*) FROM information_schema.TABLES WHERE 1 = 0")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                SchemaDocError::query_failed("Cannot access information_schema.TABLES", e)
            })?;

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

        let count = mysql_lenient::integer(&row, "schema_count", None)?;
        Ok(count.unwrap_or(0) > 0)
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
            let name = mysql_lenient::text(row, "TABLE_NAME", None)?.unwrap_or_default();
            let comment = mysql_lenient::text(row, "TABLE_COMMENT", Some(name.as_str()))?;
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
            let ordinal = mysql_lenient::integer(row, "ORDINAL_POSITION", ctx)?.unwrap_or(0);
            let column_key = mysql_lenient::text(row, "COLUMN_KEY", ctx)?.unwrap_or_default();

            columns.push(ColumnMeta {
                name: mysql_lenient::text(row, "COLUMN_NAME", ctx)?.unwrap_or_default(),
                type_decl: mysql_lenient::text(row, "COLUMN_TYPE", ctx)?.unwrap_or_default(),
                comment: mysql_lenient::text(row, "COLUMN_COMMENT", ctx)?.unwrap_or_default(),
                ordinal_position: u32::try_from(ordinal)
                    .map_err(|e| SchemaDocError::parse_field("ORDINAL_POSITION", ctx, e))?,
                max_length: mysql_lenient::integer(row, "CHARACTER_MAXIMUM_LENGTH", ctx)?,
                is_primary_key: column_key.eq_ignore_ascii_case(PRIMARY_KEY),
            });
        }

        tracing::trace!("Table '{}.{}' has {} columns", schema, table, columns.len());
        Ok(columns)
    }

    fn dialect(&self) -> Dialect {
        Dialect::MySql
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

    fn config(url: &str, user: Option<&str>, password: Option<&str>) -> ExportConfig {
        PartialConfig {
            url: Some(url.to_string()),
            user: user.map(str::to_string),
            password: password.map(str::to_string),
            schema: Some("warehouse".to_string()),
            ..Default::default()
        }
        .resolve()
        .unwrap()
    }

    #[test]
    fn test_connect_options_from_jdbc_url() {
        let options =
            connect_options(&config("jdbc:mysql://fe.internal:9030/warehouse", None, None))
                .unwrap();
        assert_eq!(options.get_host(), "fe.internal");
        assert_eq!(options.get_port(), 9030);
        assert_eq!(options.get_database(), Some("warehouse"));
    }

    #[test]
    fn test_explicit_user_overrides_url_user() {
        let options = connect_options(&config(
            "mysql://url_user@localhost/warehouse",
            Some("reader"),
            Some("secret"),
        ))
        .unwrap();
        assert_eq!(options.get_username(), "reader");
    }

    #[test]
    fn test_url_user_kept_without_explicit_user() {
        let options =
            connect_options(&config("doris://url_user@localhost:9030/db", None, None)).unwrap();
        assert_eq!(options.get_username(), "url_user");
    }

    #[test]
    fn test_queries_bind_parameters() {
        assert_eq!(TABLES_QUERY.matches('?').count(), 2);
        assert_eq!(COLUMNS_QUERY.matches('?').count(), 2);
        assert!(COLUMNS_QUERY.contains("ORDER BY ORDINAL_POSITION"));
    }

    #[tokio::test]
    async fn test_closed_reader_reports_connection_error() {
        let mut catalog = MySqlCatalog {
            conn: None,
            include_views: false,
        };
        let err = catalog.list_tables("warehouse").await.unwrap_err();
        assert_eq!(err.exit_code(), crate::error::ExitCode::Connection);
        assert!(catalog.close().await.is_ok());
    }
}
