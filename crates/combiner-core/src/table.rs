//! Core table types for representing parsed delimited files

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A parsed table from a single CSV file
///
/// Every row holds exactly `columns.len()` cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data
    pub rows: Vec<Row>,
    /// Source file path
    pub source_path: PathBuf,
    /// Records dropped because their field count did not match the columns
    pub skipped_rows: usize,
}

impl Table {
    /// Create a new empty table
    pub fn new(source_path: PathBuf) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            source_path,
            skipped_rows: 0,
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, or the positional index rendered as text for headerless files
    pub name: String,
    /// Column index (0-based)
    pub index: usize,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    /// Build columns from names, assigning indices in order
    pub fn from_names<I, S>(names: I) -> Vec<Column>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column::new(name, i))
            .collect()
    }
}

/// A row of data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Build a row of text cells from raw fields
    pub fn from_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::new(fields.into_iter().map(CellValue::from).collect())
    }
}

/// A cell value
///
/// Field text is kept verbatim. `Missing` marks a cell whose column did not
/// exist in the row's source file; it serializes like an empty field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    /// Field text as read from the file
    Text(String),
    /// Column absent from the originating file
    Missing,
}

impl CellValue {
    /// Borrow the cell as a field for output
    pub fn as_str(&self) -> &str {
        match self {
            CellValue::Text(s) => s,
            CellValue::Missing => "",
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
