//! Header line selection from a raw file preview
//!
//! The user is shown the first lines of a representative file and names the
//! 1-based line that holds column names (0 for none). This module validates
//! that answer and turns it into the parser's skip/header configuration.

use crate::error::{Error, Result};
use crate::parser::decode_lossy;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Number of raw lines shown before asking for the header line
pub const DEFAULT_PREVIEW_LINES: usize = 10;

/// How the parser treats the leading lines of every file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// Whether the first line after the skipped ones holds column names
    pub has_header: bool,
    /// Lines discarded before the header (or first data) line
    pub skip_rows: usize,
}

impl HeaderConfig {
    /// Translate a validated 1-based header line number (0 = no header)
    pub fn from_line_number(line: usize) -> Self {
        Self {
            has_header: line > 0,
            skip_rows: line.saturating_sub(1),
        }
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self::from_line_number(1)
    }
}

/// Reason a header line answer was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderLineRejection {
    /// The answer is not an integer
    #[error("'{0}' is not a valid number")]
    NotANumber(String),

    /// The line is negative or past the end of the preview
    #[error("please enter a number between 0 and {max}")]
    OutOfRange { max: usize },
}

/// Validate a header line answer against the preview it refers to
///
/// An empty answer means "no header row".
pub fn parse_header_line(
    input: &str,
    preview_len: usize,
) -> std::result::Result<usize, HeaderLineRejection> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(0);
    }

    let line: i64 = input
        .parse()
        .map_err(|_| HeaderLineRejection::NotANumber(input.to_string()))?;

    if line < 0 || line as u64 > preview_len as u64 {
        return Err(HeaderLineRejection::OutOfRange { max: preview_len });
    }

    Ok(line as usize)
}

/// Check an already-numeric header line against the preview length
pub fn check_header_line(
    line: usize,
    preview_len: usize,
) -> std::result::Result<HeaderConfig, HeaderLineRejection> {
    if line > preview_len {
        return Err(HeaderLineRejection::OutOfRange { max: preview_len });
    }
    Ok(HeaderConfig::from_line_number(line))
}

/// Read up to `max_lines` raw lines from a file for display
///
/// Undecodable bytes are replaced, surrounding whitespace is trimmed.
pub fn read_preview<P: AsRef<Path>>(path: P, max_lines: usize) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = BufReader::new(file);
    let mut lines = Vec::with_capacity(max_lines);
    let mut buf = Vec::new();

    while lines.len() < max_lines {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        if read == 0 {
            break;
        }
        lines.push(decode_lossy(&buf).trim().to_string());
    }

    Ok(lines)
}
