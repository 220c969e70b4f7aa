//! Column selection and projection of the combined table

use crate::combiner::CombinedTable;
use crate::table::{Column, Row};
use crate::tagger::SOURCE_COLUMN;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Which columns to emit, and in what order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSpec {
    /// Every column in its original order
    #[default]
    All,
    /// Explicit ordered names; duplicates allowed
    Names(Vec<String>),
}

impl ColumnSpec {
    /// Build an explicit selection, putting the source column first if absent
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        if !names.iter().any(|n| n == SOURCE_COLUMN) {
            names.insert(0, SOURCE_COLUMN.to_string());
        }
        ColumnSpec::Names(names)
    }

    /// Only the source column
    pub fn source_only() -> Self {
        Self::names(std::iter::empty::<String>())
    }
}

/// Non-fatal problems found while projecting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionWarning {
    /// A requested column is not in the combined table
    ColumnMissing(String),
    /// Nothing would be left; the table was emitted unprojected
    ProjectionEmpty,
}

impl std::fmt::Display for ProjectionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionWarning::ColumnMissing(name) => {
                write!(f, "column '{}' not found in combined data, skipping it", name)
            }
            ProjectionWarning::ProjectionEmpty => {
                write!(f, "no selected columns exist, writing all columns instead")
            }
        }
    }
}

/// A projected table plus whatever was skipped on the way
#[derive(Debug, Clone)]
pub struct Projection {
    /// The projected table, or the input unchanged on fallback
    pub table: CombinedTable,
    /// Skipped columns and fallbacks, in the order they were found
    pub warnings: Vec<ProjectionWarning>,
}

/// Apply a column selection to the combined table
pub fn project(table: CombinedTable, spec: &ColumnSpec) -> Projection {
    let requested = match spec {
        ColumnSpec::All => {
            return Projection {
                table,
                warnings: Vec::new(),
            }
        }
        ColumnSpec::Names(names) => names,
    };

    let mut warnings = Vec::new();
    let mut picked: Vec<(String, usize)> = Vec::new();

    if !requested.iter().any(|n| n == SOURCE_COLUMN) {
        if let Some(col) = table.find_column(SOURCE_COLUMN) {
            picked.push((col.name.clone(), col.index));
        }
    }

    for name in requested {
        match table.find_column(name) {
            Some(col) => picked.push((col.name.clone(), col.index)),
            None => {
                warn!(column = %name, "requested column not found");
                warnings.push(ProjectionWarning::ColumnMissing(name.clone()));
            }
        }
    }

    if picked.is_empty() {
        warn!("projection would remove every column, keeping all");
        warnings.push(ProjectionWarning::ProjectionEmpty);
        return Projection { table, warnings };
    }

    let rows = table
        .rows
        .into_iter()
        .map(|row| {
            Row::new(
                picked
                    .iter()
                    .map(|(_, idx)| row.cells[*idx].clone())
                    .collect(),
            )
        })
        .collect();

    let projected = CombinedTable {
        columns: Column::from_names(picked.into_iter().map(|(name, _)| name)),
        rows,
        sources: table.sources,
    };

    Projection {
        table: projected,
        warnings,
    }
}

/// Reason a selection string was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// A part is neither a number nor a `start-end` range
    #[error("'{0}' is not a column number or range")]
    NotANumber(String),

    /// A single column number outside `[1, max]`
    #[error("invalid column number: {index}. Must be between 1 and {max}")]
    OutOfRange { index: usize, max: usize },

    /// A range that is reversed or leaves `[1, max]`
    #[error("invalid range: {range}. Must be between 1 and {max}")]
    InvalidRange { range: String, max: usize },
}

/// Resolve a user selection like `1-3,5` against the combined columns
///
/// `""` and `all` keep every column, `none` keeps only the source column.
/// Indices are 1-based; order and duplicates are preserved. One bad part
/// rejects the whole selection.
pub fn resolve_selection(
    input: &str,
    columns: &[Column],
) -> std::result::Result<ColumnSpec, SelectionError> {
    let selection = input.trim().to_lowercase();
    match selection.as_str() {
        "" | "all" => return Ok(ColumnSpec::All),
        "none" => return Ok(ColumnSpec::source_only()),
        _ => {}
    }

    let max = columns.len();
    let mut indices = Vec::new();

    for part in selection.split(',').map(str::trim) {
        if let Some((start, end)) = part.split_once('-') {
            let start = parse_index(start, part)?;
            let end = parse_index(end, part)?;
            if start < 1 || start > end || end > max {
                return Err(SelectionError::InvalidRange {
                    range: part.to_string(),
                    max,
                });
            }
            indices.extend(start..=end);
        } else {
            let index = parse_index(part, part)?;
            if index < 1 || index > max {
                return Err(SelectionError::OutOfRange { index, max });
            }
            indices.push(index);
        }
    }

    Ok(ColumnSpec::names(indices.into_iter().map(|i| columns[i - 1].name.clone())))
}

fn parse_index(s: &str, part: &str) -> std::result::Result<usize, SelectionError> {
    s.trim()
        .parse()
        .map_err(|_| SelectionError::NotANumber(part.to_string()))
}
