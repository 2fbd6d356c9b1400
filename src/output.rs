use crate::organizer::{DateKey, OrganizedSheets};
use crate::sheet::{copy_sheet, merge_sheets, SampleSheet};
use anyhow::{anyhow, Context, Result};
use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const FILES_DIRNAME: &str = "files";

pub fn output_filename(files_dir: &Path, date: &DateKey) -> PathBuf {
    files_dir.join(format!("{}.SampleSheet.csv", date))
}

/// First name for `date` not already taken in `files_dir`: `<date>.SampleSheet.csv`,
/// then `<date>_2.SampleSheet.csv`, `<date>_3.SampleSheet.csv` and so on.
pub fn unused_output_filename(files_dir: &Path, date: &DateKey) -> PathBuf {
    let mut output = output_filename(files_dir, date);
    let mut seq = 2;
    while output.exists() {
        output = files_dir.join(format!("{}_{}.SampleSheet.csv", date, seq));
        seq += 1;
    }
    output
}

/// Writes one sheet per date into `files_dir`: a byte copy when the date has a
/// single sheet, a merge otherwise. Existing files from an earlier run the same
/// day are kept; the new file takes the next free name. Stops at the first failure.
pub fn write_organized(
    organized: &OrganizedSheets,
    sheets: &HashMap<PathBuf, SampleSheet>,
    files_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(files_dir)
        .with_context(|| format!("Failed to create output directory: {}", files_dir.display()))?;

    let mut written = Vec::with_capacity(organized.dated.len());
    for (date, paths) in &organized.dated {
        let output = unused_output_filename(files_dir, date);
        match paths.as_slice() {
            [] => continue,
            [single] => {
                copy_sheet(single, &output)?;
                info!("Copied {} to {}", single.display(), output.display());
            }
            many => {
                let parsed = many
                    .iter()
                    .map(|p| sheets.get(p).ok_or_else(|| anyhow!("Sheet was not parsed: {}", p.display())))
                    .collect::<Result<Vec<_>>>()?;
                let samples = merge_sheets(&parsed, &output)?;
                info!("Merged {} sheets ({} samples) into {}", many.len(), samples, output.display());
            }
        }
        written.push(output);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtraColumnPolicy;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn one_file_per_date() {
        let dir = TempDir::new().unwrap();
        let mut sheets = HashMap::new();
        let mut paths = Vec::new();
        for (name, sample) in [("a.csv", "a1"), ("b.csv", "b1"), ("c.csv", "c1")] {
            let path = dir.path().join(name);
            fs::write(&path, format!("[Header],,,,,,,,,\nSample_ID,,,,,,,,,\n{},,,,,,,,,\n", sample)).unwrap();
            sheets.insert(path.clone(), SampleSheet::read(&path, ExtraColumnPolicy::Reject).unwrap());
            paths.push(path);
        }
        let first = DateKey::from_yymmdd("170120").unwrap();
        let second = DateKey::from_yymmdd("181017").unwrap();
        let organized = OrganizedSheets {
            dated: BTreeMap::from([(first, vec![paths[0].clone()]), (second, vec![paths[1].clone(), paths[2].clone()])]),
            unparsed: Vec::new(),
        };
        let files_dir = dir.path().join("out").join(FILES_DIRNAME);

        let written = write_organized(&organized, &sheets, &files_dir).unwrap();
        assert_eq!(
            written,
            vec![files_dir.join("2017-01-20.SampleSheet.csv"), files_dir.join("2018-10-17.SampleSheet.csv")]
        );
        assert_eq!(fs::read(&written[0]).unwrap(), fs::read(&paths[0]).unwrap());
        let merged = fs::read_to_string(&written[1]).unwrap();
        assert_eq!(merged.lines().count(), 5);
    }

    #[test]
    fn same_day_rerun_keeps_earlier_output() {
        let dir = TempDir::new().unwrap();
        let first_sheet = dir.path().join("first.csv");
        let second_sheet = dir.path().join("second.csv");
        fs::write(&first_sheet, "[Header],,,,,,,,,\nSample_ID,,,,,,,,,\nfirst,,,,,,,,,\n").unwrap();
        fs::write(&second_sheet, "[Header],,,,,,,,,\nSample_ID,,,,,,,,,\nsecond,,,,,,,,,\n").unwrap();
        let date = DateKey::from_yymmdd("170120").unwrap();
        let files_dir = dir.path().join(FILES_DIRNAME);
        let organized_with = |path: &PathBuf| OrganizedSheets {
            dated: BTreeMap::from([(date, vec![path.clone()])]),
            unparsed: Vec::new(),
        };

        let first = write_organized(&organized_with(&first_sheet), &HashMap::new(), &files_dir).unwrap();
        let second = write_organized(&organized_with(&second_sheet), &HashMap::new(), &files_dir).unwrap();
        let third = write_organized(&organized_with(&second_sheet), &HashMap::new(), &files_dir).unwrap();

        assert_eq!(first, vec![files_dir.join("2017-01-20.SampleSheet.csv")]);
        assert_eq!(second, vec![files_dir.join("2017-01-20_2.SampleSheet.csv")]);
        assert_eq!(third, vec![files_dir.join("2017-01-20_3.SampleSheet.csv")]);
        assert_eq!(fs::read(&first[0]).unwrap(), fs::read(&first_sheet).unwrap());
        assert_eq!(fs::read(&second[0]).unwrap(), fs::read(&second_sheet).unwrap());
    }

    #[test]
    fn merge_requires_parsed_sheets() {
        let dir = TempDir::new().unwrap();
        let date = DateKey::from_yymmdd("170120").unwrap();
        let organized = OrganizedSheets {
            dated: BTreeMap::from([(date, vec![dir.path().join("x.csv"), dir.path().join("y.csv")])]),
            unparsed: Vec::new(),
        };
        assert!(write_organized(&organized, &HashMap::new(), dir.path()).is_err());
    }
}
