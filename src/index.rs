//! Append-only record of sheets that have already been merged.
//!
//! One absolute path per line. The file is never rewritten: duplicates are
//! tolerated and resolved by file identity when candidates are filtered.
//! Only one writer may use an index file at a time; nothing here locks it.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PathIndex {
    path: PathBuf,
}

impl PathIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every indexed path in file order. A missing index file is empty.
    pub fn load(&self) -> Result<Vec<PathBuf>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Index file {} does not exist yet.", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read index file: {}", self.path.display()))
            }
        };

        let mut paths = Vec::new();
        for (line_num, raw) in bytes.split(|b| *b == b'\n').enumerate() {
            let line = match std::str::from_utf8(raw) {
                Ok(s) => s.trim(),
                Err(_) => {
                    warn!("Skipping non UTF-8 line {} in index {}", line_num + 1, self.path.display());
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            let path = PathBuf::from(line);
            if !path.is_absolute() {
                warn!("Skipping relative path on line {} in index {}: {}", line_num + 1, self.path.display(), line);
                continue;
            }
            paths.push(path);
        }
        Ok(paths)
    }

    /// Appends the canonical form of each path. Paths that can no longer be
    /// resolved are written as given, made absolute against the working directory.
    pub fn append(&self, paths: &[PathBuf]) -> Result<usize> {
        if paths.is_empty() {
            return Ok(0);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create index directory: {}", parent.display()))?;
        }

        let mut lines = String::new();
        for path in paths {
            let resolved = match fs::canonicalize(path) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Could not resolve {} for the index: {}", path.display(), e);
                    std::path::absolute(path)
                        .with_context(|| format!("Failed to make path absolute: {}", path.display()))?
                }
            };
            lines.push_str(&resolved.to_string_lossy());
            lines.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open index file for append: {}", self.path.display()))?;
        file.write_all(lines.as_bytes())
            .with_context(|| format!("Failed to append to index file: {}", self.path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync index file: {}", self.path.display()))?;
        Ok(paths.len())
    }
}
