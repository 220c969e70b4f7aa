//! Output naming and serialization of the combined table

use crate::combiner::CombinedTable;
use crate::error::{Error, Result};
use crate::table::CellValue;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Mode of the written file; temp files start out owner-only
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// Pick a destination in `dir` that does not clobber an existing file
///
/// `<folder>-combined.csv` if free, else `<folder>-combined-1.csv`,
/// `<folder>-combined-2.csv`, ...
pub fn unique_output_path<P: AsRef<Path>>(dir: P, folder_name: &str) -> PathBuf {
    let dir = dir.as_ref();
    let mut candidate = dir.join(format!("{}-combined.csv", folder_name));

    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}-combined-{}.csv", folder_name, counter));
        counter += 1;
    }

    candidate
}

/// Whether `output` would be written directly inside `dir`
///
/// A combined file placed there would be picked up as input by the next run.
/// Paths that cannot be resolved are treated as outside.
pub fn lands_in_dir<P: AsRef<Path>, Q: AsRef<Path>>(output: P, dir: Q) -> bool {
    let parent = match output.as_ref().parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), fs::canonicalize(dir.as_ref())) {
        (Ok(parent), Ok(dir)) => parent == dir,
        _ => false,
    }
}

/// Write the table as CSV with a header row
///
/// The data goes to a temp file next to `path` and is moved into place only
/// when complete. An existing file at `path` is never overwritten.
pub fn write_csv<P: AsRef<Path>>(table: &CombinedTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let csv_err = |e: csv::Error| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        };
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());

        writer
            .write_record(table.columns.iter().map(|c| c.name.as_str()))
            .map_err(csv_err)?;
        for row in &table.rows {
            writer
                .write_record(row.cells.iter().map(CellValue::as_str))
                .map_err(csv_err)?;
        }
        writer.flush()?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(OUTPUT_MODE))?;
    }

    tmp.persist_noclobber(path).map_err(|e| Error::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
