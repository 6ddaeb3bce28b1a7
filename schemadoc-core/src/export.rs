//! The export pipeline: catalog in, document model out.
//!
//! Reads every table of one schema and renders it into a
//! [`SchemaDocument`]. Nothing touches the filesystem here; the caller saves
//! the document only once every query has succeeded.

use crate::{Result, catalog::CatalogReader, render::SchemaDocument};
use std::time::{Duration, Instant};

/// Counts reported after a successful export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Tables rendered
    pub tables: usize,
    /// Column rows rendered across all tables
    pub columns: usize,
    /// Wall time spent reading and rendering
    pub duration: Duration,
}

/// Reads `schema` through `reader` and renders one section per table.
///
/// Columns are rendered in ascending ordinal position whatever order the
/// catalog returned them in. A missing schema is not an error: it is
/// logged and yields an empty document.
///
/// # Errors
/// Propagates the first catalog error; no partial document is returned.
pub async fn export_schema(
    reader: &mut dyn CatalogReader,
    schema: &str,
    comment_delimiter: Option<&str>,
) -> Result<(SchemaDocument, ExportSummary)> {
    let started = Instant::now();

    if !reader.schema_exists(schema).await? {
        tracing::warn!(
            "Schema '{}' not found in {} catalog; the document will be empty",
            schema,
            reader.dialect()
        );
    }

    let tables = reader.list_tables(schema).await?;
    tracing::info!("Documenting {} tables from schema '{}'", tables.len(), schema);

    let mut document = SchemaDocument::new().with_comment_delimiter(comment_delimiter);
    let mut column_total: usize = 0;

    for table in &tables {
        let mut columns = reader.list_columns(schema, &table.name).await?;
        columns.sort_by_key(|c| c.ordinal_position);

        let mut section = document.add_table_section(table);
        for column in &columns {
            section.add_column_row(column);
        }

        column_total = column_total.saturating_add(columns.len());
        tracing::debug!("Rendered table '{}' ({} columns)", table.name, columns.len());
    }

    let summary = ExportSummary {
        tables: document.section_count(),
        columns: column_total,
        duration: started.elapsed(),
    };
    tracing::info!(
        "Export finished: {} tables, {} columns in {:.2?}",
        summary.tables,
        summary.columns,
        summary.duration
    );

    Ok((document, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExitCode, SchemaDocError};
    use crate::models::{ColumnMeta, Dialect, TableMeta};
    use crate::render::{COLUMN_COUNT, PRIMARY_KEY_MARKER};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// In-memory catalog keyed by table name.
    #[derive(Default)]
    struct FakeCatalog {
        schema_present: bool,
        tables: Vec<TableMeta>,
        columns: HashMap<String, Vec<ColumnMeta>>,
        failing_table: Option<String>,
        column_calls: usize,
    }

    impl FakeCatalog {
        fn with_table(mut self, name: &str, comment: &str, columns: Vec<ColumnMeta>) -> Self {
            self.schema_present = true;
            self.tables
                .push(TableMeta::new(name, Some(comment.to_string())));
            self.columns.insert(name.to_string(), columns);
            self
        }
    }

    #[async_trait]
    impl CatalogReader for FakeCatalog {
        async fn test_connection(&mut self) -> Result<()> {
            Ok(())
        }

        async fn schema_exists(&mut self, _schema: &str) -> Result<bool> {
            Ok(self.schema_present)
        }

        async fn list_tables(&mut self, _schema: &str) -> Result<Vec<TableMeta>> {
            Ok(self.tables.clone())
        }

        async fn list_columns(&mut self, _schema: &str, table: &str) -> Result<Vec<ColumnMeta>> {
            self.column_calls += 1;
            if self.failing_table.as_deref() == Some(table) {
                return Err(SchemaDocError::query_failed(
                    format!("Failed to collect columns for table '{}'", table),
                    std::io::Error::other("permission denied"),
                ));
            }
            Ok(self.columns.get(table).cloned().unwrap_or_default())
        }

        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn column(name: &str, ordinal: u32, pk: bool) -> ColumnMeta {
        ColumnMeta {
            name: name.to_string(),
            type_decl: "integer".to_string(),
            comment: String::new(),
            ordinal_position: ordinal,
            max_length: None,
            is_primary_key: pk,
        }
    }

    #[tokio::test]
    async fn test_one_section_per_table() {
        let mut catalog = FakeCatalog::default()
            .with_table("a", "", vec![column("id", 1, true), column("x", 2, false)])
            .with_table("b", "", vec![column("id", 1, true)])
            .with_table("c", "", vec![]);

        let (doc, summary) = export_schema(&mut catalog, "public", None).await.unwrap();

        assert_eq!(summary.tables, 3);
        assert_eq!(summary.columns, 3);
        assert_eq!(doc.section_count(), 3);

        let data_rows: Vec<usize> = doc.sections().iter().map(|s| s.data_rows().len()).collect();
        assert_eq!(data_rows, [2, 1, 0]);
        for section in doc.sections() {
            assert!(section.rows().iter().all(|r| r.cells().len() == COLUMN_COUNT));
        }
    }

    #[tokio::test]
    async fn test_columns_rendered_in_ordinal_order() {
        let mut catalog = FakeCatalog::default().with_table(
            "events",
            "",
            vec![column("c", 3, false), column("a", 1, true), column("b", 2, false)],
        );

        let (doc, _) = export_schema(&mut catalog, "public", None).await.unwrap();

        let names: Vec<&str> = doc.sections()[0]
            .data_rows()
            .iter()
            .map(|r| r.cells()[1].text())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_primary_key_marker() {
        let mut catalog = FakeCatalog::default().with_table(
            "users",
            "",
            vec![column("id", 1, true), column("email", 2, false)],
        );

        let (doc, _) = export_schema(&mut catalog, "public", None).await.unwrap();

        let keys: Vec<&str> = doc.sections()[0]
            .data_rows()
            .iter()
            .map(|r| r.cells()[6].text())
            .collect();
        assert_eq!(keys, [PRIMARY_KEY_MARKER, ""]);
    }

    #[tokio::test]
    async fn test_empty_schema_yields_empty_document() {
        let mut catalog = FakeCatalog::default();

        let (doc, summary) = export_schema(&mut catalog, "missing", None).await.unwrap();

        assert_eq!(doc.section_count(), 0);
        assert_eq!(summary.tables, 0);
        assert_eq!(summary.columns, 0);
    }

    #[tokio::test]
    async fn test_comment_split_on_delimiter() {
        let mut catalog = FakeCatalog::default().with_table(
            "orders",
            "表中文名称：订单表 | 表用途：保存订单",
            vec![],
        );

        let (doc, _) = export_schema(&mut catalog, "public", Some("|")).await.unwrap();

        assert_eq!(
            doc.sections()[0].paragraphs(),
            ["表中文名称：订单表", "表英文名称：orders", "表用途：保存订单"]
        );
    }

    #[tokio::test]
    async fn test_query_failure_aborts_export() {
        let mut catalog = FakeCatalog::default()
            .with_table("a", "", vec![column("id", 1, true)])
            .with_table("b", "", vec![column("id", 1, true)])
            .with_table("c", "", vec![column("id", 1, true)]);
        catalog.failing_table = Some("b".to_string());

        let err = export_schema(&mut catalog, "public", None).await.unwrap_err();

        assert_eq!(err.exit_code(), ExitCode::Query);
        assert_eq!(catalog.column_calls, 2);
    }
}
