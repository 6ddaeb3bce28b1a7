//! OOXML serialization of a [`SchemaDocument`].

use super::{COLUMN_WIDTHS, Row, SchemaDocument, Section};
use crate::{Result, error::SchemaDocError};
use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableLayoutType, TableRow, WidthType};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Table width in fiftieths of a percent (100%).
const TABLE_WIDTH_PCT: usize = 5000;

impl SchemaDocument {
    /// Builds the `.docx` object model: per section, three paragraphs and
    /// one fixed-layout table, closed by a single empty paragraph.
    pub fn to_docx(&self) -> Docx {
        self.sections
            .iter()
            .fold(Docx::new(), |docx, section| append_section(docx, section))
            .add_paragraph(Paragraph::new())
    }

    /// Writes the document to `path`, replacing any existing file.
    ///
    /// The bytes go to a temporary file next to `path` which is renamed into
    /// place only after the archive is complete, so a failed save never
    /// leaves a truncated document behind.
    ///
    /// # Errors
    /// Returns a write error if the directory is missing or not writable, or
    /// if packing the archive fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
            SchemaDocError::write_failed(path, "Cannot create file in output directory", e)
        })?;

        self.to_docx()
            .build()
            .pack(tmp.as_file_mut())
            .map_err(|e| SchemaDocError::write_failed(path, "Failed to pack document", e))?;

        let file = tmp.as_file_mut();
        file.flush()
            .and_then(|()| file.sync_all())
            .map_err(|e| SchemaDocError::write_failed(path, "Failed to flush document", e))?;

        tmp.persist(path).map_err(|e| {
            SchemaDocError::write_failed(path, "Failed to move document into place", e.error)
        })?;

        tracing::info!(
            "Wrote {} table sections to {}",
            self.section_count(),
            path.display()
        );
        Ok(())
    }
}

fn append_section(docx: Docx, section: &Section) -> Docx {
    let docx = section.paragraphs().iter().fold(docx, |docx, line| {
        docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)))
    });

    let rows = section.rows().iter().map(table_row).collect();
    let table = Table::new(rows)
        .set_grid(COLUMN_WIDTHS.to_vec())
        .layout(TableLayoutType::Fixed)
        .width(TABLE_WIDTH_PCT, WidthType::Pct);

    docx.add_table(table)
}

fn table_row(row: &Row) -> TableRow {
    let cells = row
        .cells()
        .iter()
        .map(|cell| {
            let mut run = Run::new().add_text(cell.text());
            if row.is_header() {
                run = run.bold();
            }
            TableCell::new()
                .add_paragraph(Paragraph::new().add_run(run))
                .width(cell.width(), WidthType::Dxa)
        })
        .collect();
    TableRow::new(cells)
}
