use crate::config::DateStrategy;
use crate::sheet::SampleSheet;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use time::{Date, Month};

lazy_static! {
    static ref YYMMDD_RE: Regex = Regex::new(r"^(\d{2})(\d{2})(\d{2})").unwrap();
}

/// Sequencing date, `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(Date);

impl DateKey {
    /// Parses a code starting with six digits, `YYMMDD`, as a 21st century date.
    pub fn from_yymmdd(code: &str) -> Option<Self> {
        let caps = YYMMDD_RE.captures(code.trim())?;
        let year: i32 = caps[1].parse().ok()?;
        let month: u8 = caps[2].parse().ok()?;
        let day: u8 = caps[3].parse().ok()?;
        let month = Month::try_from(month).ok()?;
        Date::from_calendar_date(2000 + year, month, day).ok().map(DateKey)
    }

    pub fn date(&self) -> Date {
        self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.0.year(), u8::from(self.0.month()), self.0.day())
    }
}

/// Date from the run folder name: the leading six characters of the part
/// before the first underscore.
pub fn date_from_folder(folder: &Path) -> Option<DateKey> {
    let name = folder.file_name()?.to_str()?;
    let prefix = name.split('_').next()?.trim();
    DateKey::from_yymmdd(prefix)
}

/// Date from the sheet's `ContainerID` row; the id must be exactly six digits.
pub fn date_from_container_id(sheet: &SampleSheet) -> Option<DateKey> {
    let id = sheet.container_id()?;
    if id.len() != 6 {
        return None;
    }
    DateKey::from_yymmdd(id)
}

pub fn sequencing_date(sheet: &SampleSheet, strategy: DateStrategy) -> Option<DateKey> {
    let from_folder = || sheet.path.parent().and_then(date_from_folder);
    match strategy {
        DateStrategy::FolderName => from_folder(),
        DateStrategy::ContainerId => date_from_container_id(sheet),
        DateStrategy::Auto => date_from_container_id(sheet).or_else(from_folder),
    }
}

/// Sheets grouped by sequencing date. Each date's paths are sorted and unique.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrganizedSheets {
    pub dated: BTreeMap<DateKey, Vec<PathBuf>>,
    /// Sheets whose date could not be derived.
    pub unparsed: Vec<PathBuf>,
}

impl OrganizedSheets {
    pub fn sheet_count(&self) -> usize {
        self.dated.values().map(Vec::len).sum()
    }

    pub fn dated_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.dated.values().flatten()
    }
}

pub fn organize<'a, I>(sheets: I, strategy: DateStrategy) -> OrganizedSheets
where
    I: IntoIterator<Item = &'a SampleSheet>,
{
    let mut dated: BTreeMap<DateKey, BTreeSet<PathBuf>> = BTreeMap::new();
    let mut unparsed = BTreeSet::new();
    for sheet in sheets {
        match sequencing_date(sheet, strategy) {
            Some(key) => {
                dated.entry(key).or_default().insert(sheet.path.clone());
            }
            None => {
                unparsed.insert(sheet.path.clone());
            }
        }
    }

    OrganizedSheets {
        dated: dated.into_iter().map(|(k, v)| (k, v.into_iter().collect())).collect(),
        unparsed: unparsed.into_iter().collect(),
    }
}
