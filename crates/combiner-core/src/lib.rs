//! combiner-core: Core library for combining delimited text files
//!
//! This library provides functionality to:
//! - Discover CSV files directly inside a folder
//! - Turn a chosen header line into skip/header settings
//! - Parse files tolerantly, dropping rows with the wrong field count
//! - Tag every row with the base name of its source file
//! - Concatenate, select columns and write one combined CSV

pub mod combiner;
pub mod error;
pub mod header;
pub mod output;
pub mod parser;
pub mod projector;
pub mod scanner;
pub mod table;
pub mod tagger;

pub use combiner::{
    combine_directory, combine_with_spec, concat_tables, ensure_output_free, load_tagged,
    CombineOptions, CombineOutcome, CombineReport, CombinedTable, FileFailure,
};
pub use error::{Error, Result};
pub use header::{
    check_header_line, parse_header_line, read_preview, HeaderConfig, HeaderLineRejection,
    DEFAULT_PREVIEW_LINES,
};
pub use output::{lands_in_dir, unique_output_path, write_csv};
pub use parser::{parse_csv, parse_csv_str};
pub use projector::{
    project, resolve_selection, ColumnSpec, Projection, ProjectionWarning, SelectionError,
};
pub use scanner::{discover_files, list_subfolders};
pub use table::{CellValue, Column, Row, Table};
pub use tagger::{tag_rows, SourceTag, SOURCE_COLUMN};
