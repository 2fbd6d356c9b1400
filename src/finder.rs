//! The find → dedupe → group → merge pipeline.

use crate::config::FinderConfig;
use crate::dedup::{filter_new, unique_by_identity};
use crate::error::SheetError;
use crate::index::PathIndex;
use crate::locator::locate;
use crate::organizer::organize;
use crate::output::{write_organized, FILES_DIRNAME};
use crate::report::RunReport;
use crate::sheet::SampleSheet;
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Counts and files of one completed run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub run_dir: PathBuf,
    pub report: PathBuf,
    pub written: Vec<PathBuf>,
    pub defined: usize,
    pub missing: usize,
    pub recursive: usize,
    pub selected: usize,
    pub unreadable: usize,
    pub unparsed: usize,
    pub indexed: usize,
}

pub struct SampleSheetFinder {
    config: FinderConfig,
    index: PathIndex,
}

impl SampleSheetFinder {
    pub fn new(config: FinderConfig) -> Self {
        let index = PathIndex::new(&config.index_file);
        Self { config, index }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Runs the pipeline with today's local date naming the output folder.
    pub fn run(&self, root: &Path) -> Result<RunSummary> {
        let today = OffsetDateTime::now_local()
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
            .date();
        self.run_on(root, today)
    }

    /// Runs the pipeline, writing into `<output_root>/<run_date>/`.
    ///
    /// Sheets are only added to the index after every merged file and the
    /// report have been written, so a failed run leaves them to be retried.
    pub fn run_on(&self, root: &Path, run_date: Date) -> Result<RunSummary> {
        info!("Searching for sample sheets in: {}", root.display());
        let indexed = self.index.load()?;
        info!("Loaded {} indexed sheets from {}", indexed.len(), self.index.path().display());

        let located = locate(root, self.config.search)?;
        info!("Found {} SampleSheets.", located.defined.len());
        info!("{} folders were missing SampleSheets.", located.missing.len());
        if self.config.search.is_recursive() {
            info!("Found {} SampleSheets recursively.", located.recursive.len());
        }

        let candidates = unique_by_identity(located.candidates());
        let selected = filter_new(&candidates, &indexed);
        info!("Selected {} new SampleSheets.", selected.len());

        let mut sheets = HashMap::with_capacity(selected.len());
        let mut unreadable: Vec<SheetError> = Vec::new();
        for path in &selected {
            match SampleSheet::read(path, self.config.extra_columns) {
                Ok(sheet) => {
                    if sheet.has_nonstandard_header() {
                        warn!("{} has a non-standard header: {:?}", path.display(), sheet.header);
                    }
                    sheets.insert(path.clone(), sheet);
                }
                Err(e) => {
                    warn!("Skipping unreadable sheet: {}", e);
                    unreadable.push(e);
                }
            }
        }

        let organized = organize(sheets.values(), self.config.date_strategy);
        for path in &organized.unparsed {
            warn!("Could not derive a sequencing date for {}", path.display());
        }
        info!(
            "Organized {} sheets into {} dates ({} without a date).",
            organized.sheet_count(),
            organized.dated.len(),
            organized.unparsed.len()
        );

        let run_dir = self.run_dir(run_date)?;
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create run directory: {}", run_dir.display()))?;

        info!("Generating the output files in {}", run_dir.display());
        let written = write_organized(&organized, &sheets, &run_dir.join(FILES_DIRNAME))?;
        let report = RunReport { located: &located, unreadable: &unreadable, organized: &organized }
            .write(&run_dir)?;

        let processed: Vec<PathBuf> = organized.dated_paths().cloned().collect();
        let indexed_now = self.index.append(&processed)?;
        info!("Appended {} sheets to the index.", indexed_now);

        Ok(RunSummary {
            run_dir,
            report,
            written,
            defined: located.defined.len(),
            missing: located.missing.len(),
            recursive: located.recursive.len(),
            selected: selected.len(),
            unreadable: unreadable.len(),
            unparsed: organized.unparsed.len(),
            indexed: indexed_now,
        })
    }

    fn run_dir(&self, run_date: Date) -> Result<PathBuf> {
        let name = run_date
            .format(format_description!("[year]-[month]-[day]"))
            .context("Failed to format run date")?;
        Ok(self.config.output_root.join(name))
    }
}
