use crate::error::SheetError;
use crate::locator::LocatedSheets;
use crate::organizer::OrganizedSheets;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_FILENAME: &str = "filelist.txt";

/// Everything a run found and did, for `filelist.txt`.
pub struct RunReport<'a> {
    pub located: &'a LocatedSheets,
    pub unreadable: &'a [SheetError],
    pub organized: &'a OrganizedSheets,
}

impl RunReport<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let missing = &self.located.missing;
        section(&mut out, format!("Directories missing samplesheets ({}):", missing.len()), missing);
        found(&mut out, "expected sheets", &self.located.defined);
        found(&mut out, "recursively found sheets", &self.located.recursive);

        let _ = writeln!(out, "Found {} unreadable sheets:", self.unreadable.len());
        for err in self.unreadable {
            let _ = writeln!(out, "\t{}", err.path().display());
            let _ = writeln!(out, "\t\t{}", err);
        }

        found(&mut out, "sheets without a sequencing date", &self.organized.unparsed);

        out.push_str("Final layout:\n");
        for (date, sheets) in &self.organized.dated {
            let _ = writeln!(out, "\t{}", date);
            for sheet in sheets {
                let _ = writeln!(out, "\t\t{}", sheet.display());
            }
        }
        out
    }

    pub fn write(&self, run_dir: &Path) -> Result<PathBuf> {
        let path = run_dir.join(REPORT_FILENAME);
        fs::write(&path, self.render()).with_context(|| format!("Failed to write run report: {}", path.display()))?;
        Ok(path)
    }
}

fn found(out: &mut String, what: &str, paths: &[PathBuf]) {
    section(out, format!("Found {} {}:", paths.len(), what), paths);
}

fn section(out: &mut String, heading: String, paths: &[PathBuf]) {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();
    out.push_str(&heading);
    out.push('\n');
    for path in sorted {
        let _ = writeln!(out, "\t{}", path.display());
    }
}
