//! Sample sheet parsing and merging.
//!
//! A sheet is a preamble of instrument metadata rows, a header row whose first
//! cell is `Sample_ID`, then one row per sample. Every row is read positionally
//! against [`FIELDNAMES`].

use crate::config::ExtraColumnPolicy;
use crate::error::SheetError;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub const FIELDNAMES: [&str; 10] = [
    "Sample_ID",
    "Sample_Name",
    "Species",
    "Project",
    "NucleicAcid",
    "Sample_Well",
    "I7_Index_ID",
    "index",
    "I5_Index_ID",
    "index2",
];

/// First cell of the header row.
pub const HEADER_SENTINEL: &str = "Sample_ID";

/// First cell of the preamble row carrying the container id.
pub const CONTAINER_ID_FIELD: &str = "ContainerID";

/// One row padded to the fixed field count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow(Vec<String>);

impl SheetRow {
    pub(crate) fn from_record(record: &StringRecord) -> Self {
        let mut values: Vec<String> = record.iter().take(FIELDNAMES.len()).map(str::to_string).collect();
        values.resize(FIELDNAMES.len(), String::new());
        SheetRow(values)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        FIELDNAMES
            .iter()
            .position(|name| *name == field)
            .map(|i| self.0[i].as_str())
    }

    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct SampleSheet {
    pub path: PathBuf,
    pub preamble: Vec<SheetRow>,
    /// Cells of the `Sample_ID` row as written, if the sheet has one.
    pub header: Option<Vec<String>>,
    pub rows: Vec<SheetRow>,
}

impl SampleSheet {
    pub fn read(path: &Path, policy: ExtraColumnPolicy) -> Result<Self, SheetError> {
        let bytes = fs::read(path).map_err(|source| SheetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let mut preamble = Vec::new();
        let mut header = None;
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|source| SheetError::Csv {
                path: path.to_path_buf(),
                source,
            })?;

            if record.len() > FIELDNAMES.len() {
                let line = record.position().map_or(0, |p| line_at(&bytes, p.byte()));
                match policy {
                    ExtraColumnPolicy::Reject => {
                        return Err(SheetError::ExtraColumns {
                            path: path.to_path_buf(),
                            line,
                            found: record.len(),
                            expected: FIELDNAMES.len(),
                        });
                    }
                    ExtraColumnPolicy::Truncate => {
                        warn!(
                            "{}: dropping {} extra columns on line {}",
                            path.display(),
                            record.len() - FIELDNAMES.len(),
                            line
                        );
                    }
                }
            }

            if header.is_none() && record.get(0) == Some(HEADER_SENTINEL) {
                header = Some(record.iter().map(str::to_string).collect());
                continue;
            }

            let row = SheetRow::from_record(&record);
            if header.is_none() {
                preamble.push(row);
            } else {
                rows.push(row);
            }
        }

        debug!(
            "Read {}: {} preamble rows, {} samples",
            path.display(),
            preamble.len(),
            rows.len()
        );
        Ok(SampleSheet { path: path.to_path_buf(), preamble, header, rows })
    }

    /// The raw `ContainerID` value from the preamble.
    pub fn container_id(&self) -> Option<&str> {
        self.preamble
            .iter()
            .find(|row| row.first() == CONTAINER_ID_FIELD)
            .and_then(|row| row.get("Sample_Name"))
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// True when the header row names fields other than [`FIELDNAMES`].
    pub fn has_nonstandard_header(&self) -> bool {
        match &self.header {
            Some(cells) => {
                let named: Vec<&str> = cells.iter().map(String::as_str).filter(|c| !c.is_empty()).collect();
                named != FIELDNAMES
            }
            None => false,
        }
    }
}

/// 1-based line of the record starting at `offset`. The csv reader may report
/// the start of a record before the `\n` of a preceding `\r\n`, so leading
/// terminator bytes are skipped first.
fn line_at(bytes: &[u8], offset: u64) -> u64 {
    let mut start = (offset as usize).min(bytes.len());
    while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
        start += 1;
    }
    bytes[..start].iter().filter(|b| **b == b'\n').count() as u64 + 1
}

/// Writes all preambles, one header row, then all samples, each in input order.
pub fn merge_sheets(sheets: &[&SampleSheet], output: &Path) -> Result<usize> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_path(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;

    for sheet in sheets {
        for row in &sheet.preamble {
            writer.write_record(row.values())?;
        }
    }
    writer
        .write_record(FIELDNAMES)
        .with_context(|| format!("Failed to write header to: {}", output.display()))?;

    let mut samples = 0;
    for sheet in sheets {
        for row in &sheet.rows {
            writer.write_record(row.values())?;
            samples += 1;
        }
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush output file: {}", output.display()))?;
    Ok(samples)
}

/// Copies a lone sheet byte for byte.
pub fn copy_sheet(source: &Path, output: &Path) -> Result<()> {
    fs::copy(source, output)
        .with_context(|| format!("Failed to copy {} to {}", source.display(), output.display()))?;
    Ok(())
}
