//! In-memory model of the schema document.
//!
//! Each table becomes a section: three descriptive paragraphs followed by a
//! fixed-width 9-column grid with a bold header row and one row per column.
//! The model is serialized to `.docx` by [`SchemaDocument::save`].

mod docx;

use crate::models::{ColumnMeta, TableComment, TableMeta};

/// Cell widths in dxa (twentieths of a point), one per grid column.
pub const COLUMN_WIDTHS: [usize; 9] = [1000, 2500, 3500, 1500, 1000, 1500, 1500, 1500, 2500];

/// Number of cells in every row.
pub const COLUMN_COUNT: usize = COLUMN_WIDTHS.len();

/// Header row labels.
pub const HEADER_LABELS: [&str; COLUMN_COUNT] = [
    "表英文名",
    "字段英文名",
    "字段中文解释",
    "字段数据类型",
    "字段序号",
    "字段长度",
    "约束条件主键",
    "是否代码",
    "备注",
];

/// Marker written in the key cell of primary-key columns.
pub const PRIMARY_KEY_MARKER: &str = "PK";

const DISPLAY_NAME_LABEL: &str = "表中文名称：";
const TABLE_NAME_LABEL: &str = "表英文名称：";
const PURPOSE_LABEL: &str = "表用途：";

/// One grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    text: String,
    width: usize,
}

impl Cell {
    /// Cell text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cell width in dxa.
    pub const fn width(&self) -> usize {
        self.width
    }
}

/// One grid row; always exactly [`COLUMN_COUNT`] cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<Cell>,
    header: bool,
}

impl Row {
    /// Builds a row from cell values, creating blank cells for missing
    /// values and dropping extras so every row matches the grid.
    fn from_values<I, S>(values: I, header: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values = values.into_iter();
        let cells = COLUMN_WIDTHS
            .iter()
            .map(|&width| Cell {
                text: values.next().map(Into::into).unwrap_or_default(),
                width,
            })
            .collect();
        Self { cells, header }
    }

    /// Cells in grid order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Whether this is the bold header row.
    pub const fn is_header(&self) -> bool {
        self.header
    }

    /// Cell texts in grid order.
    pub fn texts(&self) -> Vec<&str> {
        self.cells.iter().map(Cell::text).collect()
    }
}

/// Paragraphs and grid for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    table_name: String,
    paragraphs: Vec<String>,
    rows: Vec<Row>,
}

impl Section {
    /// Name of the documented table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Descriptive lines preceding the grid.
    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    /// All grid rows, header first.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Grid rows without the header.
    pub fn data_rows(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or_default()
    }
}

/// The document under construction.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    sections: Vec<Section>,
    comment_delimiter: Option<String>,
}

impl SchemaDocument {
    /// Creates an empty document that renders table comments verbatim.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the delimiter used to split table comments into display name
    /// and purpose. `None` or an empty string disables splitting.
    pub fn with_comment_delimiter(mut self, delimiter: Option<&str>) -> Self {
        self.comment_delimiter = delimiter.filter(|d| !d.is_empty()).map(str::to_string);
        self
    }

    /// Appends a section for `table` and returns the handle used to add its
    /// column rows.
    pub fn add_table_section(&mut self, table: &TableMeta) -> TableSection<'_> {
        let comment = TableComment::parse(&table.comment, self.comment_delimiter.as_deref());

        let section = Section {
            table_name: table.name.clone(),
            paragraphs: vec![
                format!("{}{}", DISPLAY_NAME_LABEL, comment.display_name),
                format!("{}{}", TABLE_NAME_LABEL, table.name),
                format!("{}{}", PURPOSE_LABEL, comment.purpose),
            ],
            rows: vec![Row::from_values(HEADER_LABELS, true)],
        };

        let slot = self.sections.len();
        self.sections.push(section);
        TableSection {
            document: self,
            slot,
        }
    }

    /// Sections in document order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Number of table sections.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Total data rows across all sections.
    pub fn column_row_count(&self) -> usize {
        self.sections.iter().map(|s| s.data_rows().len()).sum()
    }
}

/// Handle to one section's grid, borrowed from its document.
///
/// Rows always land in the section the handle was created for.
#[derive(Debug)]
pub struct TableSection<'a> {
    document: &'a mut SchemaDocument,
    slot: usize,
}

impl TableSection<'_> {
    /// Appends the row describing `column`.
    pub fn add_column_row(&mut self, column: &ColumnMeta) {
        let Some(section) = self.document.sections.get_mut(self.slot) else {
            return;
        };

        let row = Row::from_values(
            [
                section.table_name.clone(),
                column.name.clone(),
                column.comment.clone(),
                column.type_decl.clone(),
                column.ordinal_position.to_string(),
                column
                    .max_length
                    .map(|len| len.to_string())
                    .unwrap_or_default(),
                if column.is_primary_key {
                    PRIMARY_KEY_MARKER.to_string()
                } else {
                    String::new()
                },
                String::new(),
                String::new(),
            ],
            false,
        );
        section.rows.push(row);
    }

    /// Name of the table this section documents.
    pub fn table_name(&self) -> &str {
        self.document
            .sections
            .get(self.slot)
            .map_or("", |s| s.table_name.as_str())
    }
}
