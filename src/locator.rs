use crate::config::{SearchMode, SHEET_FILENAME};
use anyhow::{Context, Result};
use glob::{glob_with, MatchOptions, Pattern};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Sheets found under one root folder.
///
/// Traversal errors are never swallowed: an unreadable root or subfolder fails
/// the whole search, so a partially scanned tree is never indexed.
#[derive(Debug, Default, Clone)]
pub struct LocatedSheets {
    /// `<subfolder>/SampleSheet.csv` files that exist.
    pub defined: Vec<PathBuf>,
    /// Subfolders without a sheet at the expected location.
    pub missing: Vec<PathBuf>,
    /// Canonical paths found by the recursive search, if one was requested.
    pub recursive: Vec<PathBuf>,
}

impl LocatedSheets {
    /// Defined sheets followed by recursively found ones.
    pub fn candidates(&self) -> Vec<PathBuf> {
        self.defined.iter().chain(self.recursive.iter()).cloned().collect()
    }
}

pub fn expected_filename(folder: &Path) -> PathBuf {
    folder.join(SHEET_FILENAME)
}

pub fn locate(root: &Path, mode: SearchMode) -> Result<LocatedSheets> {
    let (defined, missing) = find_expected_sheets(root)?;
    let recursive = match mode {
        SearchMode::Expected => Vec::new(),
        SearchMode::Glob => find_globbed_sheets(root)?,
        SearchMode::Walk { max_depth } => find_walked_sheets(root, max_depth)?,
    };
    Ok(LocatedSheets { defined, missing, recursive })
}

/// Checks each immediate subfolder of `root` for a sheet at the expected location.
pub fn find_expected_sheets(root: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("Failed to list root folder: {}", root.display()))?;

    let mut defined = Vec::new();
    let mut missing = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", root.display()))?;
        let subfolder = entry.path();
        // follows symlinks, like a plain `is_dir` check
        let metadata = fs::metadata(&subfolder)
            .with_context(|| format!("Failed to stat {}", subfolder.display()))?;
        if !metadata.is_dir() {
            continue;
        }

        let expected = expected_filename(&subfolder);
        let exists = expected
            .try_exists()
            .with_context(|| format!("Failed to check for {}", expected.display()))?;
        if exists {
            debug!("Found {}", expected.display());
            defined.push(expected);
        } else {
            missing.push(subfolder);
        }
    }
    defined.sort();
    missing.sort();
    Ok((defined, missing))
}

/// Finds every `SampleSheet.csv` below `root`, matching the name case-sensitively.
pub fn find_globbed_sheets(root: &Path) -> Result<Vec<PathBuf>> {
    let root_str = root.to_string_lossy();
    let pattern = format!("{}/**/{}", Pattern::escape(&root_str), SHEET_FILENAME);
    info!("Searching for sample sheets matching pattern: {}", pattern);

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let mut sheets = Vec::new();
    for entry in glob_with(&pattern, options)? {
        let path = entry.with_context(|| format!("Failed to search {}", root.display()))?;
        if !path.is_file() {
            continue;
        }
        sheets.push(resolve(&path)?);
    }
    sheets.sort();
    if sheets.is_empty() {
        warn!("No sample sheets found matching the pattern: {}", pattern);
    }
    Ok(sheets)
}

/// Finds every `SampleSheet.csv` at most `max_depth` entries below `root`.
pub fn find_walked_sheets(root: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
    info!("Walking {} for sample sheets (max depth {})", root.display(), max_depth);
    let mut sheets = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if entry.file_type().is_file() && entry.file_name() == SHEET_FILENAME {
            sheets.push(resolve(entry.path())?);
        }
    }
    sheets.sort();
    Ok(sheets)
}

fn resolve(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve {}", path.display()))
}
