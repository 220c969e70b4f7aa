//! Directory scanner for discovering input files and candidate folders

use crate::error::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Find files with the given extension directly inside `dir`
///
/// Sub-directories are not descended into. The extension match ignores ASCII
/// case. Results are sorted by file name so runs are reproducible across
/// platforms.
pub fn discover_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir.as_ref())
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// List the direct sub-directories of `base`, sorted by name
pub fn list_subfolders<P: AsRef<Path>>(base: P) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();

    for entry in WalkDir::new(base.as_ref())
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            folders.push(entry.into_path());
        }
    }

    Ok(folders)
}
