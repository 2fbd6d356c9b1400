//! End-to-end runs of the sample sheet pipeline against temporary folders.

use samplesheet_sync::config::SHEET_FILENAME;
use samplesheet_sync::index::PathIndex;
use samplesheet_sync::{DateStrategy, ExtraColumnPolicy, FinderConfig, SampleSheetFinder, SearchMode};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use time::macros::date;
use time::Date;

const RUN_DATE: Date = date!(2024 - 03 - 05);

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(name);
    fs::read_to_string(&path).expect("Failed to read fixture")
}

struct TestEnv {
    _temp: TempDir,
    pub raw: PathBuf,
    pub config_dir: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let raw = temp.path().join("raw_folder");
        let config_dir = temp.path().join("config");
        fs::create_dir_all(&raw).expect("Failed to create raw dir");
        Self { _temp: temp, raw, config_dir }
    }

    /// Laid out like the instrument's raw folder: two runs with sheets, one without.
    fn with_standard_runs() -> Self {
        let env = Self::new();
        env.add_run("170120", Some(&fixture("170120.SampleSheet.csv")));
        env.add_run("181017", Some(&fixture("181017.SampleSheet.csv")));
        env.add_run("190519", None);
        env
    }

    fn add_run(&self, folder: &str, sheet: Option<&str>) -> PathBuf {
        let dir = self.raw.join(folder);
        fs::create_dir_all(&dir).expect("Failed to create run dir");
        if let Some(content) = sheet {
            fs::write(dir.join(SHEET_FILENAME), content).expect("Failed to write sheet");
        }
        dir.join(SHEET_FILENAME)
    }

    fn config(&self) -> FinderConfig {
        FinderConfig::in_config_dir(&self.config_dir)
    }

    fn files_dir(&self) -> PathBuf {
        self.config().output_root.join("2024-03-05").join("files")
    }

    fn indexed(&self) -> Vec<PathBuf> {
        PathIndex::new(self.config().index_file).load().unwrap()
    }
}

fn data_rows(merged: &str) -> Vec<String> {
    merged
        .lines()
        .skip_while(|l| !l.starts_with("Sample_ID,"))
        .skip(1)
        .map(|l| l.split(',').next().unwrap().to_string())
        .collect()
}

#[test]
fn first_run_writes_one_sheet_per_date() {
    let env = TestEnv::with_standard_runs();
    let finder = SampleSheetFinder::new(env.config());

    let summary = finder.run_on(&env.raw, RUN_DATE).unwrap();

    let files = env.files_dir();
    let first = files.join("2017-01-20.SampleSheet.csv");
    let second = files.join("2018-10-17.SampleSheet.csv");
    assert_eq!(summary.written, vec![first.clone(), second.clone()]);
    assert!(!files.join("2019-05-19.SampleSheet.csv").exists());

    // lone sheets are copied verbatim
    assert_eq!(fs::read(&first).unwrap(), fs::read(env.raw.join("170120").join(SHEET_FILENAME)).unwrap());
    assert_eq!(fs::read(&second).unwrap(), fs::read(env.raw.join("181017").join(SHEET_FILENAME)).unwrap());

    let report = fs::read_to_string(&summary.report).unwrap();
    let mut lines = report.lines();
    assert_eq!(lines.next(), Some("Directories missing samplesheets (1):"));
    assert_eq!(lines.next(), Some(format!("\t{}", env.raw.join("190519").display()).as_str()));
    assert!(report.contains("Found 2 expected sheets:"));
    assert!(report.contains("\t2017-01-20\n"));

    assert_eq!(summary.selected, 2);
    assert_eq!(summary.indexed, 2);
    assert_eq!(env.indexed().len(), 2);
}

#[test]
fn index_grows_monotonically_across_runs() {
    let env = TestEnv::with_standard_runs();
    let finder = SampleSheetFinder::new(env.config());

    assert_eq!(finder.run_on(&env.raw, RUN_DATE).unwrap().selected, 2);
    let second = finder.run_on(&env.raw, RUN_DATE).unwrap();
    assert_eq!(second.selected, 0);
    assert!(second.written.is_empty());
    assert_eq!(env.indexed().len(), 2);

    let late = env.add_run("190519", Some(&fixture("190519.SampleSheet.csv")));
    let third = finder.run_on(&env.raw, RUN_DATE).unwrap();
    assert_eq!(third.selected, 1);

    let indexed = env.indexed();
    assert_eq!(indexed.len(), 3);
    assert_eq!(indexed[2], fs::canonicalize(late).unwrap());
}

#[test]
fn same_date_sheets_are_merged_in_order() {
    let env = TestEnv::new();
    env.add_run("runA", Some(&fixture("170120.SampleSheet.csv")));
    let relabelled = fixture("190519.SampleSheet.csv").replace("ContainerID,190519", "ContainerID,170120");
    env.add_run("runB", Some(&relabelled));
    let finder = SampleSheetFinder::new(env.config().with_date_strategy(DateStrategy::ContainerId));

    let summary = finder.run_on(&env.raw, RUN_DATE).unwrap();
    assert_eq!(summary.written.len(), 1);

    let merged = fs::read_to_string(&summary.written[0]).unwrap();
    assert_eq!(merged.matches("Sample_ID,Sample_Name").count(), 1);
    assert_eq!(merged.matches("[Header]").count(), 2);
    assert_eq!(
        data_rows(&merged),
        vec!["012017_1", "012017_2", "051919_1", "051919_2", "051919_3"]
    );
    let container_ids: Vec<&str> = merged.lines().filter(|l| l.starts_with("ContainerID,")).collect();
    assert_eq!(container_ids.len(), 2);
}

#[test]
fn undatable_sheets_are_reported_not_indexed() {
    let env = TestEnv::new();
    let undated = fixture("170120.SampleSheet.csv").replace("ContainerID,170120", "ContainerID,");
    let sheet = env.add_run("flowcell_A", Some(&undated));
    let finder = SampleSheetFinder::new(env.config().with_date_strategy(DateStrategy::Auto));

    let summary = finder.run_on(&env.raw, RUN_DATE).unwrap();
    assert_eq!(summary.unparsed, 1);
    assert!(summary.written.is_empty());
    assert!(env.indexed().is_empty());

    let report = fs::read_to_string(&summary.report).unwrap();
    assert!(report.contains("Found 1 sheets without a sequencing date:"));
    assert!(report.contains(&sheet.display().to_string()));
}

#[test]
fn extra_columns_follow_the_policy() {
    let wide = format!(
        "{}012017_9,Sample9,Human,170120P,DNA,H12,N709,GCTACGCT,S502,CTCTCTAT,unexpected\r\n",
        fixture("170120.SampleSheet.csv")
    );

    let strict = TestEnv::new();
    strict.add_run("170120", Some(&wide));
    let summary = SampleSheetFinder::new(strict.config()).run_on(&strict.raw, RUN_DATE).unwrap();
    assert_eq!(summary.unreadable, 1);
    assert!(summary.written.is_empty());
    assert!(strict.indexed().is_empty());
    let report = fs::read_to_string(&summary.report).unwrap();
    assert!(report.contains("line 12 has 11 columns"));

    let lenient = TestEnv::new();
    lenient.add_run("170120", Some(&wide));
    lenient.add_run("170120_B", Some(&fixture("170120.SampleSheet.csv")));
    let finder = SampleSheetFinder::new(lenient.config().with_extra_columns(ExtraColumnPolicy::Truncate));
    let summary = finder.run_on(&lenient.raw, RUN_DATE).unwrap();
    assert_eq!(summary.unreadable, 0);
    let merged = fs::read_to_string(&summary.written[0]).unwrap();
    assert_eq!(data_rows(&merged).len(), 5);
    assert!(!merged.contains("unexpected"));
}

#[test]
fn recursive_search_does_not_duplicate_expected_sheets() {
    let env = TestEnv::with_standard_runs();
    let nested = env.raw.join("190519").join("Data").join("Intensities");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join(SHEET_FILENAME), fixture("190519.SampleSheet.csv")).unwrap();
    let finder = SampleSheetFinder::new(env.config().with_search(SearchMode::Glob));

    let summary = finder.run_on(&env.raw, RUN_DATE).unwrap();
    assert_eq!(summary.defined, 2);
    assert_eq!(summary.recursive, 3);
    assert_eq!(summary.selected, 3);
    assert_eq!(summary.written.len(), 3);
    assert_eq!(env.indexed().len(), 3);
}

#[cfg(unix)]
#[test]
fn aliased_paths_count_as_indexed() {
    let env = TestEnv::with_standard_runs();
    let alias = env.raw.parent().unwrap().join("raw_alias");
    std::os::unix::fs::symlink(&env.raw, &alias).unwrap();
    fs::create_dir_all(&env.config_dir).unwrap();
    let aliased = alias.join("170120").join(SHEET_FILENAME);
    fs::write(env.config().index_file, format!("{}\n", aliased.display())).unwrap();

    let summary = SampleSheetFinder::new(env.config()).run_on(&env.raw, RUN_DATE).unwrap();
    assert_eq!(summary.selected, 1);
    assert_eq!(summary.written, vec![env.files_dir().join("2018-10-17.SampleSheet.csv")]);
}

#[test]
fn failed_output_leaves_index_untouched() {
    let env = TestEnv::with_standard_runs();
    let blocked = env.raw.parent().unwrap().join("blocked");
    fs::write(&blocked, "not a directory").unwrap();
    let mut config = env.config();
    config.output_root = blocked;

    assert!(SampleSheetFinder::new(config.clone()).run_on(&env.raw, RUN_DATE).is_err());
    assert!(PathIndex::new(&config.index_file).load().unwrap().is_empty());
}
