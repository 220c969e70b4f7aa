//! Combine engine: discover, parse, tag, concatenate, project, write

use crate::error::{Error, Result};
use crate::header::{HeaderConfig, DEFAULT_PREVIEW_LINES};
use crate::output::write_csv;
use crate::parser::parse_csv;
use crate::projector::{project, ColumnSpec, ProjectionWarning};
use crate::scanner::discover_files;
use crate::table::{CellValue, Column, Row, Table};
use crate::tagger::{tag_rows, SourceTag};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows from every source file, tagged and concatenated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedTable {
    /// Union of all source columns in first-appearance order
    pub columns: Vec<Column>,
    /// Rows in file order, then within-file order
    pub rows: Vec<Row>,
    /// Files that contributed, in processing order
    pub sources: Vec<PathBuf>,
}

impl CombinedTable {
    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name (first match)
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Settings shared by every file in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineOptions {
    /// Extension of input files, without the dot
    pub extension: String,
    /// Raw lines shown when asking for the header line
    pub preview_lines: usize,
    /// Header line handling applied to every file
    pub header: HeaderConfig,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            extension: "csv".to_string(),
            preview_lines: DEFAULT_PREVIEW_LINES,
            header: HeaderConfig::default(),
        }
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Discovering,
    ParsingFiles,
    Concatenating,
    Projecting,
    Writing,
    Succeeded,
    Failed,
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(from = ?*stage, to = ?next, "combine stage");
    *stage = next;
}

/// A file that could not be included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    /// File that was skipped
    pub path: PathBuf,
    /// Rendered error that caused the skip
    pub reason: String,
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineReport {
    /// Where the combined file was written
    pub output: PathBuf,
    /// Number of files whose rows made it into the output
    pub files_combined: usize,
    /// Final column names, in output order
    pub columns: Vec<String>,
    /// Data rows written
    pub rows: usize,
    /// Malformed rows dropped across all files
    pub skipped_rows: usize,
    /// Files skipped because they could not be read or parsed
    pub failures: Vec<FileFailure>,
    /// Column selection problems that did not stop the run
    pub warnings: Vec<ProjectionWarning>,
}

impl CombineReport {
    /// Render the report as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum CombineOutcome {
    /// No matching files in the directory; nothing written
    NoFiles { dir: PathBuf },
    /// Every discovered file failed; nothing written
    AllFilesFailed { failures: Vec<FileFailure> },
    /// The column selection was abandoned; nothing written
    Cancelled,
    /// Output written
    Combined(CombineReport),
}

/// Parse and tag each file, collecting failures instead of stopping
///
/// Returned tables keep the order of `files`.
pub fn load_tagged(files: &[PathBuf], header: &HeaderConfig) -> (Vec<Table>, Vec<FileFailure>) {
    let mut tables = Vec::new();
    let mut failures = Vec::new();

    for path in files {
        let tag = SourceTag::from_path(path);
        match parse_csv(path, header).and_then(|table| tag_rows(table, &tag)) {
            Ok(table) => {
                if table.skipped_rows > 0 {
                    warn!(
                        file = %tag,
                        skipped = table.skipped_rows,
                        "dropped rows with the wrong number of fields"
                    );
                }
                info!(file = %tag, rows = table.row_count(), "processed");
                tables.push(table);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                failures.push(FileFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    (tables, failures)
}

/// Concatenate tables into one, preserving table order then row order
///
/// Columns are the union of all tables' columns in first-appearance order;
/// cells a table does not have are `Missing`.
pub fn concat_tables(tables: Vec<Table>) -> CombinedTable {
    let mut names: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for table in &tables {
        for col in &table.columns {
            if seen.insert(col.name.clone()) {
                names.push(col.name.clone());
            }
        }
    }

    let columns = Column::from_names(names);
    let col_index: HashMap<&str, usize> = columns
        .iter()
        .map(|c| (c.name.as_str(), c.index))
        .collect();

    let mut rows = Vec::with_capacity(tables.iter().map(Table::row_count).sum());
    let mut sources = Vec::with_capacity(tables.len());

    for table in tables {
        let targets: Vec<usize> = table
            .columns
            .iter()
            .map(|c| col_index[c.name.as_str()])
            .collect();

        for row in table.rows {
            let mut cells = vec![CellValue::Missing; columns.len()];
            for (cell, &target) in row.cells.into_iter().zip(&targets) {
                cells[target] = cell;
            }
            rows.push(Row::new(cells));
        }

        sources.push(table.source_path);
    }

    CombinedTable {
        columns,
        rows,
        sources,
    }
}

/// Combine every matching file in `dir` into `output`
///
/// `select_columns` is called once with the combined columns, before
/// projection, so an interactive caller can show them and ask for a
/// selection. Returning `None` abandons the run before anything is written.
pub fn combine_directory<P, Q, F>(
    dir: P,
    output: Q,
    options: &CombineOptions,
    select_columns: F,
) -> Result<CombineOutcome>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: FnOnce(&[Column]) -> Option<ColumnSpec>,
{
    let dir = dir.as_ref();
    let output = output.as_ref();
    let mut stage = Stage::Idle;

    advance(&mut stage, Stage::Discovering);
    let files = discover_files(dir, &options.extension)?;
    if files.is_empty() {
        advance(&mut stage, Stage::Failed);
        warn!(dir = %dir.display(), "no {} files found", options.extension);
        return Ok(CombineOutcome::NoFiles {
            dir: dir.to_path_buf(),
        });
    }
    info!(count = files.len(), dir = %dir.display(), "discovered files");

    advance(&mut stage, Stage::ParsingFiles);
    let (tables, failures) = load_tagged(&files, &options.header);
    if tables.is_empty() {
        advance(&mut stage, Stage::Failed);
        warn!("no files were successfully processed");
        return Ok(CombineOutcome::AllFilesFailed { failures });
    }

    advance(&mut stage, Stage::Concatenating);
    let skipped_rows = tables.iter().map(|t| t.skipped_rows).sum();
    let combined = concat_tables(tables);

    advance(&mut stage, Stage::Projecting);
    let spec = match select_columns(&combined.columns) {
        Some(spec) => spec,
        None => {
            advance(&mut stage, Stage::Failed);
            info!("column selection cancelled");
            return Ok(CombineOutcome::Cancelled);
        }
    };
    let projection = project(combined, &spec);

    advance(&mut stage, Stage::Writing);
    if let Err(e) = write_csv(&projection.table, output) {
        advance(&mut stage, Stage::Failed);
        return Err(e);
    }
    advance(&mut stage, Stage::Succeeded);

    let table = projection.table;
    info!(
        files = table.sources.len(),
        rows = table.row_count(),
        output = %output.display(),
        "combined"
    );

    Ok(CombineOutcome::Combined(CombineReport {
        output: output.to_path_buf(),
        files_combined: table.sources.len(),
        columns: table.column_names().into_iter().map(String::from).collect(),
        rows: table.row_count(),
        skipped_rows,
        failures,
        warnings: projection.warnings,
    }))
}

/// Combine with a selection fixed up front
pub fn combine_with_spec<P: AsRef<Path>, Q: AsRef<Path>>(
    dir: P,
    output: Q,
    options: &CombineOptions,
    spec: &ColumnSpec,
) -> Result<CombineOutcome> {
    combine_directory(dir, output, options, |_| Some(spec.clone()))
}

/// Reject a run whose output path is already taken
pub fn ensure_output_free<P: AsRef<Path>>(output: P) -> Result<()> {
    let output = output.as_ref();
    if output.exists() {
        return Err(Error::Persist {
            path: output.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::AlreadyExists, "file exists"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::unique_output_path;
    use crate::parser::parse_csv_str;
    use crate::tagger::SOURCE_COLUMN;
    use std::fs;

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    fn report(outcome: CombineOutcome) -> CombineReport {
        match outcome {
            CombineOutcome::Combined(report) => report,
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_two_files_combined_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "id,name\n3,z").unwrap();
        fs::write(dir.path().join("a.csv"), "id,name\n1,x\n2,y").unwrap();
        let output = dir.path().join("out.csv");

        let outcome =
            combine_with_spec(dir.path(), &output, &CombineOptions::default(), &ColumnSpec::All)
                .unwrap();
        let report = report(outcome);

        assert_eq!(report.files_combined, 2);
        assert_eq!(report.rows, 3);
        assert_eq!(report.columns, vec![SOURCE_COLUMN, "id", "name"]);
        assert_eq!(
            read_rows(&output),
            vec![
                vec!["Source_File", "id", "name"],
                vec!["a", "1", "x"],
                vec!["a", "2", "y"],
                vec!["b", "3", "z"],
            ]
        );
    }

    #[test]
    fn test_malformed_row_dropped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "id,name\n1,x\n2").unwrap();
        let output = dir.path().join("out.csv");

        let report = report(
            combine_with_spec(dir.path(), &output, &CombineOptions::default(), &ColumnSpec::All)
                .unwrap(),
        );

        assert_eq!(report.rows, 1);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(read_rows(&output).len(), 2);
    }

    #[test]
    fn test_empty_directory_reports_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");

        let outcome =
            combine_with_spec(dir.path(), &output, &CombineOptions::default(), &ColumnSpec::All)
                .unwrap();

        assert!(matches!(outcome, CombineOutcome::NoFiles { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_bad_file_skipped_others_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "id\n1\n").unwrap();
        fs::write(dir.path().join("b.csv"), "").unwrap();
        fs::write(dir.path().join("c.csv"), "id\n2\n").unwrap();
        let output = dir.path().join("out.csv");

        let report = report(
            combine_with_spec(dir.path(), &output, &CombineOptions::default(), &ColumnSpec::All)
                .unwrap(),
        );

        assert_eq!(report.files_combined, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("b.csv"));
        assert_eq!(
            read_rows(&output)[1..].to_vec(),
            vec![vec!["a", "1"], vec!["c", "2"]]
        );
    }

    #[test]
    fn test_all_files_failed_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "").unwrap();
        fs::write(dir.path().join("b.csv"), "Source_File,id\nx,1\n").unwrap();
        let output = dir.path().join("out.csv");

        let outcome =
            combine_with_spec(dir.path(), &output, &CombineOptions::default(), &ColumnSpec::All)
                .unwrap();

        match outcome {
            CombineOutcome::AllFilesFailed { failures } => assert_eq!(failures.len(), 2),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_rerun_gets_suffixed_output() {
        let base = tempfile::tempdir().unwrap();
        let folder = base.path().join("sales");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("a.csv"), "id\n1\n").unwrap();

        let options = CombineOptions::default();
        let first = unique_output_path(base.path(), "sales");
        report(combine_with_spec(&folder, &first, &options, &ColumnSpec::All).unwrap());

        let second = unique_output_path(base.path(), "sales");
        assert_eq!(second, base.path().join("sales-combined-1.csv"));
        report(combine_with_spec(&folder, &second, &options, &ColumnSpec::All).unwrap());

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_existing_output_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("in");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("a.csv"), "id\n1\n").unwrap();
        let output = dir.path().join("out.csv");
        fs::write(&output, "previous").unwrap();

        assert!(ensure_output_free(&output).is_err());
        let result =
            combine_with_spec(&folder, &output, &CombineOptions::default(), &ColumnSpec::All);

        assert!(matches!(result, Err(Error::Persist { .. })));
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
    }

    #[test]
    fn test_selection_hook_sees_combined_columns() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "id,name,ts\n1,x,t1\n").unwrap();
        let output = dir.path().join("out.csv");

        let mut seen = Vec::new();
        let report = report(
            combine_directory(dir.path(), &output, &CombineOptions::default(), |columns| {
                seen = columns.iter().map(|c| c.name.clone()).collect();
                crate::projector::resolve_selection("1,3", columns).ok()
            })
            .unwrap(),
        );

        assert_eq!(seen, vec![SOURCE_COLUMN, "id", "name", "ts"]);
        assert_eq!(report.columns, vec![SOURCE_COLUMN, "name"]);
        assert_eq!(read_rows(&output)[1], vec!["a", "x"]);
    }

    #[test]
    fn test_cancelled_selection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "id\n1\n").unwrap();
        let output = dir.path().join("out.csv");

        let outcome =
            combine_directory(dir.path(), &output, &CombineOptions::default(), |_| None).unwrap();

        assert!(matches!(outcome, CombineOutcome::Cancelled));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_selected_column_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "id,name\n1,x\n").unwrap();
        let output = dir.path().join("out.csv");

        let report = report(
            combine_with_spec(
                dir.path(),
                &output,
                &CombineOptions::default(),
                &ColumnSpec::names(["name", "price"]),
            )
            .unwrap(),
        );

        assert_eq!(report.columns, vec![SOURCE_COLUMN, "name"]);
        assert_eq!(
            report.warnings,
            vec![ProjectionWarning::ColumnMissing("price".to_string())]
        );
    }

    #[test]
    fn test_headerless_with_skipped_preamble() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "exported\n1,x\n").unwrap();
        fs::write(dir.path().join("b.csv"), "exported\n2,y\n").unwrap();
        let output = dir.path().join("out.csv");

        let options = CombineOptions {
            header: HeaderConfig {
                has_header: false,
                skip_rows: 1,
            },
            ..CombineOptions::default()
        };
        let report = report(
            combine_with_spec(dir.path(), &output, &options, &ColumnSpec::All).unwrap(),
        );

        assert_eq!(report.columns, vec![SOURCE_COLUMN, "0", "1"]);
        assert_eq!(read_rows(&output)[2], vec!["b", "2", "y"]);
    }

    #[test]
    fn test_default_options() {
        let options = CombineOptions::default();
        assert_eq!(options.extension, "csv");
        assert_eq!(options.preview_lines, 10);
        assert_eq!(options.header, HeaderConfig::from_line_number(1));
    }

    #[test]
    fn test_extension_option_selects_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "id\n1\n").unwrap();
        fs::write(dir.path().join("b.txt"), "id\n2\n").unwrap();
        let output = dir.path().join("out.csv");

        let options = CombineOptions {
            extension: "txt".to_string(),
            ..CombineOptions::default()
        };
        let report = report(
            combine_with_spec(dir.path(), &output, &options, &ColumnSpec::All).unwrap(),
        );

        assert_eq!(read_rows(&output)[1], vec!["b", "2"]);
        assert_eq!(report.files_combined, 1);
    }

    #[test]
    fn test_concat_unions_columns() {
        let header = HeaderConfig::default();
        let a = tag_rows(
            parse_csv_str("id,name\n1,x\n", "a.csv", &header).unwrap(),
            &SourceTag::from_path("a.csv"),
        )
        .unwrap();
        let b = tag_rows(
            parse_csv_str("id,ts\n2,t\n", "b.csv", &header).unwrap(),
            &SourceTag::from_path("b.csv"),
        )
        .unwrap();

        let combined = concat_tables(vec![a, b]);

        assert_eq!(combined.column_names(), vec![SOURCE_COLUMN, "id", "name", "ts"]);
        assert_eq!(combined.rows[0].cells[3], CellValue::Missing);
        assert_eq!(combined.rows[1].cells[2], CellValue::Missing);
        assert_eq!(combined.rows[1].cells[3], CellValue::from("t"));
        assert_eq!(
            combined.sources,
            vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]
        );
    }

    #[test]
    fn test_report_json() {
        let report = CombineReport {
            output: PathBuf::from("out.csv"),
            files_combined: 1,
            columns: vec![SOURCE_COLUMN.to_string()],
            rows: 0,
            skipped_rows: 0,
            failures: Vec::new(),
            warnings: vec![ProjectionWarning::ProjectionEmpty],
        };

        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["files_combined"], 1);
        assert_eq!(value["warnings"][0], "ProjectionEmpty");
    }
}
