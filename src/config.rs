use clap::ValueEnum;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name every sequencing run folder is expected to contain.
pub const SHEET_FILENAME: &str = "SampleSheet.csv";

/// Default walk depth: the root plus three nested folder levels.
pub const DEFAULT_WALK_DEPTH: usize = 4;

pub const INDEX_FILENAME: &str = "indexed.samplesheets.txt";
pub const OUTPUT_DIRNAME: &str = "sync_files";

/// How a sheet's sequencing date is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DateStrategy {
    /// Leading YYMMDD of the run folder name.
    FolderName,
    /// YYMMDD stored in the sheet's `ContainerID` row.
    ContainerId,
    /// `ContainerID` when present, folder name otherwise.
    #[default]
    Auto,
}

/// What to do with a row that has more cells than the fixed field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExtraColumnPolicy {
    /// Treat the row as a parse error and leave the whole sheet out of the run.
    #[default]
    Reject,
    /// Drop the surplus cells and log a warning.
    Truncate,
}

/// Where to look for sheets besides `<root>/<run>/SampleSheet.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Expected,
    /// Also glob `**/SampleSheet.csv` with no depth limit.
    Glob,
    /// Also walk the tree down to `max_depth` entries below the root.
    Walk { max_depth: usize },
}

impl SearchMode {
    pub fn is_recursive(&self) -> bool {
        !matches!(self, SearchMode::Expected)
    }
}

#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Append-only list of sheets that were already merged.
    pub index_file: PathBuf,
    /// Parent of the per-run output folders.
    pub output_root: PathBuf,
    pub date_strategy: DateStrategy,
    pub search: SearchMode,
    pub extra_columns: ExtraColumnPolicy,
}

impl FinderConfig {
    pub fn new(index_file: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            index_file: index_file.into(),
            output_root: output_root.into(),
            date_strategy: DateStrategy::default(),
            search: SearchMode::default(),
            extra_columns: ExtraColumnPolicy::default(),
        }
    }

    /// Standard layout inside a configuration folder.
    pub fn in_config_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join(INDEX_FILENAME), config_dir.join(OUTPUT_DIRNAME))
    }

    pub fn with_date_strategy(mut self, strategy: DateStrategy) -> Self {
        self.date_strategy = strategy;
        self
    }

    pub fn with_search(mut self, search: SearchMode) -> Self {
        self.search = search;
        self
    }

    pub fn with_extra_columns(mut self, policy: ExtraColumnPolicy) -> Self {
        self.extra_columns = policy;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Time between the starts of two runs.
    pub wait: Duration,
    /// How often the remaining wait is logged.
    pub poll: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(3600 * 24),
            poll: Duration::from_secs(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_dir_layout() {
        let config = FinderConfig::in_config_dir(Path::new("/srv/sync"));
        assert_eq!(config.index_file, PathBuf::from("/srv/sync/indexed.samplesheets.txt"));
        assert_eq!(config.output_root, PathBuf::from("/srv/sync/sync_files"));
        assert_eq!(config.date_strategy, DateStrategy::Auto);
        assert_eq!(config.search, SearchMode::Expected);
        assert_eq!(config.extra_columns, ExtraColumnPolicy::Reject);
    }

    #[test]
    fn only_expected_search_is_flat() {
        assert!(!SearchMode::Expected.is_recursive());
        assert!(SearchMode::Glob.is_recursive());
        assert!(SearchMode::Walk { max_depth: 2 }.is_recursive());
    }
}
