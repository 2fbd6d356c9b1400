//! File identity and the "not yet indexed" filter.

use log::debug;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Identity of a file on disk: two paths are the same sheet when they resolve
/// to the same identity, whatever their spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileIdentity {
    /// Device and inode; covers hard links as well as symlinks.
    Inode { dev: u64, ino: u64 },
    /// Canonical path, for platforms without inode numbers.
    Canonical(PathBuf),
    /// Path that could not be resolved, kept as written.
    Unresolved(PathBuf),
}

impl FileIdentity {
    pub fn of(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(metadata) => {
                if let Some((dev, ino)) = inode_of(&metadata) {
                    return FileIdentity::Inode { dev, ino };
                }
                match fs::canonicalize(path) {
                    Ok(canonical) => FileIdentity::Canonical(canonical),
                    Err(_) => FileIdentity::Unresolved(path.to_path_buf()),
                }
            }
            Err(e) => {
                debug!("Cannot stat {}: {}", path.display(), e);
                FileIdentity::Unresolved(path.to_path_buf())
            }
        }
    }
}

#[cfg(unix)]
fn inode_of(metadata: &fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn inode_of(_metadata: &fs::Metadata) -> Option<(u64, u64)> {
    None
}

/// Candidates whose file identity matches none of the indexed paths, in
/// candidate order. Indexed paths that no longer exist match nothing.
pub fn filter_new(candidates: &[PathBuf], indexed: &[PathBuf]) -> Vec<PathBuf> {
    let seen: HashSet<FileIdentity> = indexed.iter().map(|p| FileIdentity::of(p)).collect();
    candidates
        .iter()
        .filter(|candidate| !seen.contains(&FileIdentity::of(candidate)))
        .cloned()
        .collect()
}

/// Keeps the first path of every file identity, so one sheet reached through
/// two searches (or two spellings) is handled once.
pub fn unique_by_identity(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::with_capacity(paths.len());
    paths
        .into_iter()
        .filter(|path| seen.insert(FileIdentity::of(path)))
        .collect()
}
