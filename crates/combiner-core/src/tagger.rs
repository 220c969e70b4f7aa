//! Source tagging: every row records the file it came from

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Table};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the provenance column prepended to every table
pub const SOURCE_COLUMN: &str = "Source_File";

/// Identifier of a source file: its base name without directory or extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTag(String);

impl SourceTag {
    /// Derive the tag from a file path (`dir/sales.csv` -> `sales`)
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let stem = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prepend the source column to a table
///
/// Fails if the table already has a column with the same name, since the
/// tag would then be ambiguous.
pub fn tag_rows(table: Table, tag: &SourceTag) -> Result<Table> {
    if table.find_column(SOURCE_COLUMN).is_some() {
        return Err(Error::SourceColumnConflict {
            path: table.source_path,
            column: SOURCE_COLUMN.to_string(),
        });
    }

    let columns = std::iter::once(SOURCE_COLUMN.to_string())
        .chain(table.columns.into_iter().map(|c| c.name));

    let rows = table
        .rows
        .into_iter()
        .map(|mut row| {
            row.cells.insert(0, CellValue::from(tag.as_str()));
            row
        })
        .collect();

    Ok(Table {
        columns: Column::from_names(columns),
        rows,
        source_path: table.source_path,
        skipped_rows: table.skipped_rows,
    })
}
