//! Catalog readers: one per SQL dialect, behind a common trait.
//!
//! A reader owns exactly one database connection for the whole run and
//! issues two parameterized queries: the tables of a schema, and the columns
//! of one table. All parameters are bound, never interpolated.
//!
//! # Module Structure
//! - `helpers`: row decoding with consistent error context
//! - `mysql`: `information_schema` reader (MySQL, MariaDB, Doris)
//! - `postgres`: `pg_catalog` reader (PostgreSQL, Kingbase)

use crate::{
    Result,
    config::ExportConfig,
    error::SchemaDocError,
    models::{ColumnMeta, Dialect, TableMeta},
};
use async_trait::async_trait;

#[cfg(any(feature = "mysql", feature = "postgresql"))]
pub(crate) mod helpers;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "postgresql")]
pub mod postgres;

/// Read access to a database's metadata catalog.
///
/// # Security
/// Implementations only issue SELECT statements against catalog views and
/// never log credentials.
///
/// # Object Safety
/// Object-safe so the entry point can hold a `Box<dyn CatalogReader>`
/// chosen at runtime from configuration.
#[async_trait]
pub trait CatalogReader: Send {
    /// Checks that the connection works and the catalog is readable.
    ///
    /// # Errors
    /// Returns a connection error if the round trip fails, or a query error
    /// if the catalog views cannot be read.
    async fn test_connection(&mut self) -> Result<()>;

    /// Reports whether `schema` exists in the catalog.
    async fn schema_exists(&mut self, schema: &str) -> Result<bool>;

    /// Lists the tables of `schema`, ordered by name.
    ///
    /// Returns an empty vector for a schema without tables.
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<TableMeta>>;

    /// Lists the columns of `schema.table`, ordered by ordinal position.
    async fn list_columns(&mut self, schema: &str, table: &str) -> Result<Vec<ColumnMeta>>;

    /// Dialect this reader speaks.
    fn dialect(&self) -> Dialect;

    /// Closes the connection. Later calls fail with a connection error.
    async fn close(&mut self) -> Result<()>;
}

/// Opens a catalog reader for the configured dialect.
///
/// # Errors
/// Returns a configuration error when the dialect is unknown or its driver
/// was not compiled in, and a connection error when connecting fails.
pub async fn open_catalog(config: &ExportConfig) -> Result<Box<dyn CatalogReader>> {
    let dialect = config.resolved_dialect()?;
    tracing::debug!("Opening {} catalog at {}", dialect, config.redacted_url());

    match dialect {
        #[cfg(feature = "mysql")]
        Dialect::MySql => Ok(Box::new(mysql::MySqlCatalog::connect(config).await?)),
        #[cfg(not(feature = "mysql"))]
        Dialect::MySql => Err(SchemaDocError::configuration(
            "MySQL support not compiled in. Use --features mysql",
        )),
        #[cfg(feature = "postgresql")]
        Dialect::Postgres => Ok(Box::new(postgres::PostgresCatalog::connect(config).await?)),
        #[cfg(not(feature = "postgresql"))]
        Dialect::Postgres => Err(SchemaDocError::configuration(
            "PostgreSQL support not compiled in. Use --features postgresql",
        )),
    }
}

/// Rewrites a connection URL into the form the dialect's driver accepts.
///
/// Strips a `jdbc:` prefix and replaces alias schemes (`doris`, `mariadb`,
/// `kingbase8`, ...) with the canonical one.
///
/// # Errors
/// Returns a configuration error if the URL has no scheme.
///
/// # Example
/// ```rust
/// use schemadoc_core::catalog::normalize_url;
/// use schemadoc_core::models::Dialect;
///
/// let url = normalize_url("jdbc:kingbase8://db:54321/app", Dialect::Postgres)?;
/// assert_eq!(url, "postgres://db:54321/app");
/// # Ok::<(), schemadoc_core::SchemaDocError>(())
/// ```
pub fn normalize_url(url: &str, dialect: Dialect) -> Result<String> {
    let url = url.trim();
    let url = url.strip_prefix("jdbc:").unwrap_or(url);
    let (scheme, rest) = url.split_once("://").ok_or_else(|| {
        SchemaDocError::configuration("Connection URL must look like <scheme>://<host>/...")
    })?;

    if dialect.schemes().contains(&scheme.to_ascii_lowercase().as_str()) {
        Ok(format!("{}://{}", dialect.canonical_scheme(), rest))
    } else {
        Ok(url.to_string())
    }
}

/// Wraps a connect future with the configured timeout and error context.
#[cfg(any(feature = "mysql", feature = "postgresql"))]
pub(crate) async fn connect_with_timeout<C, F>(config: &ExportConfig, connect: F) -> Result<C>
where
    F: std::future::Future<Output = std::result::Result<C, sqlx::Error>>,
{
    let target = config.redacted_url();
    match tokio::time::timeout(config.connect_timeout, connect).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(SchemaDocError::connection_failed(
            format!("Failed to connect to {}", target),
            e,
        )),
        Err(elapsed) => Err(SchemaDocError::connection_failed(
            format!(
                "Timed out after {}s connecting to {}",
                config.connect_timeout.as_secs(),
                target
            ),
            elapsed,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_jdbc_urls() {
        assert_eq!(
            normalize_url("jdbc:mysql://fe:9030/db", Dialect::MySql).unwrap(),
            "mysql://fe:9030/db"
        );
        assert_eq!(
            normalize_url("doris://fe:9030/db", Dialect::MySql).unwrap(),
            "mysql://fe:9030/db"
        );
        assert_eq!(
            normalize_url(
                "jdbc:kingbase8://kb:54321/app?currentSchema=biz",
                Dialect::Postgres
            )
            .unwrap(),
            "postgres://kb:54321/app?currentSchema=biz"
        );
    }

    #[test]
    fn test_normalize_keeps_canonical_and_foreign_schemes() {
        assert_eq!(
            normalize_url("postgresql://u@h/db", Dialect::Postgres).unwrap(),
            "postgres://u@h/db"
        );
        // A scheme unknown to the dialect is left for the driver to reject.
        assert_eq!(
            normalize_url("tcp://h/db", Dialect::MySql).unwrap(),
            "tcp://h/db"
        );
    }

    #[test]
    fn test_normalize_rejects_schemeless_url() {
        let err = normalize_url("localhost:3306/db", Dialect::MySql).unwrap_err();
        assert!(matches!(err, SchemaDocError::Configuration { .. }));
    }

    fn config_for(url: &str) -> ExportConfig {
        ExportConfig {
            url: url.to_string(),
            credentials: crate::security::Credentials::default(),
            schema: "main".to_string(),
            output: "out.docx".into(),
            dialect: None,
            include_views: false,
            comment_delimiter: "|".to_string(),
            connect_timeout: std::time::Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_open_catalog_rejects_unknown_dialect() {
        let err = open_catalog(&config_for("sqlite://local.db")).await.err().unwrap();
        assert_eq!(err.exit_code(), crate::error::ExitCode::Configuration);
    }

    #[cfg(not(feature = "mysql"))]
    #[tokio::test]
    async fn test_mysql_driver_not_compiled_in() {
        let err = open_catalog(&config_for("mysql://127.0.0.1:1/db")).await.err().unwrap();
        assert_eq!(err.exit_code(), crate::error::ExitCode::Configuration);
        assert!(err.to_string().contains("--features mysql"));
    }

    #[cfg(not(feature = "postgresql"))]
    #[tokio::test]
    async fn test_postgres_driver_not_compiled_in() {
        let err = open_catalog(&config_for("postgres://127.0.0.1:1/db")).await.err().unwrap();
        assert_eq!(err.exit_code(), crate::error::ExitCode::Configuration);
        assert!(err.to_string().contains("--features postgresql"));
    }
}
