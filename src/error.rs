use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to read a single sample sheet. The run carries on without the sheet.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: line {line} has {found} columns, expected at most {expected}", .path.display())]
    ExtraColumns {
        path: PathBuf,
        line: u64,
        found: usize,
        expected: usize,
    },
}

impl SheetError {
    pub fn path(&self) -> &Path {
        match self {
            SheetError::Io { path, .. } => path,
            SheetError::Csv { path, .. } => path,
            SheetError::ExtraColumns { path, .. } => path,
        }
    }
}
