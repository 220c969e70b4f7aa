//! Tolerant CSV parser
//!
//! Records whose field count differs from the detected column count are
//! dropped and counted; parsing never aborts on a single bad record.

use crate::error::{Error, Result};
use crate::header::HeaderConfig;
use crate::table::{Column, Row, Table};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Decode bytes as UTF-8, replacing undecodable sequences with U+FFFD
pub fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        debug!("replaced undecodable bytes with U+FFFD");
    }
    text
}

/// Parse a CSV file into a Table
pub fn parse_csv<P: AsRef<Path>>(path: P, config: &HeaderConfig) -> Result<Table> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_csv_str(&decode_lossy(&bytes), path, config)
}

/// Parse CSV from a string, attributing it to `source_path`
pub fn parse_csv_str(
    content: &str,
    source_path: impl Into<PathBuf>,
    config: &HeaderConfig,
) -> Result<Table> {
    let source_path = source_path.into();
    let body = skip_lines(content, config.skip_rows);

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut table = Table::new(source_path);
    let mut records = csv_reader.records();

    let first = loop {
        match records.next() {
            Some(Ok(record)) => break record,
            Some(Err(e)) => {
                warn!(path = %table.source_path.display(), error = %e, "unreadable leading record");
                table.skipped_rows += 1;
            }
            None => return Err(Error::EmptyFile(table.source_path)),
        }
    };

    if config.has_header {
        table.columns = Column::from_names(normalize_headers(first.iter()));
    } else {
        table.columns = Column::from_names((0..first.len()).map(|i| i.to_string()));
        table.rows.push(Row::from_fields(first.iter()));
    }

    let width = table.column_count();
    for result in records {
        match result {
            Ok(record) if record.len() == width => {
                table.rows.push(Row::from_fields(record.iter()));
            }
            Ok(_) => table.skipped_rows += 1,
            Err(e) => {
                debug!(
                    path = %table.source_path.display(),
                    error = %e,
                    "skipping unreadable record"
                );
                table.skipped_rows += 1;
            }
        }
    }

    if table.skipped_rows > 0 {
        debug!(
            path = %table.source_path.display(),
            skipped = table.skipped_rows,
            "dropped malformed rows"
        );
    }

    Ok(table)
}

/// Drop the first `count` physical lines
fn skip_lines(content: &str, count: usize) -> &str {
    if count == 0 {
        return content;
    }
    match content.match_indices('\n').nth(count - 1) {
        Some((idx, _)) => &content[idx + 1..],
        None => "",
    }
}

/// Make header names usable as keys
///
/// Blank names become `Unnamed: <i>`; repeats get `.1`, `.2`, ... suffixes.
fn normalize_headers<'a, I>(fields: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::new();

    for (i, raw) in fields.enumerate() {
        let mut name = if raw.trim().is_empty() {
            format!("Unnamed: {}", i)
        } else {
            raw.to_string()
        };

        let mut count = counts.get(&name).copied().unwrap_or(0);
        while count > 0 {
            counts.insert(name.clone(), count + 1);
            name = format!("{}.{}", name, count);
            count = counts.get(&name).copied().unwrap_or(0);
        }
        counts.insert(name.clone(), count + 1);
        names.push(name);
    }

    names
}
