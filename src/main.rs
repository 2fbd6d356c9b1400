use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn, LevelFilter};
use samplesheet_sync::config::DEFAULT_WALK_DEPTH;
use samplesheet_sync::{
    DateStrategy, ExtraColumnPolicy, FinderConfig, RunSummary, SampleSheetFinder, Scheduler, SchedulerConfig,
    SearchMode,
};
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::macros::format_description;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SearchKind {
    /// Only `<root>/<run>/SampleSheet.csv`
    Expected,
    /// Also every `SampleSheet.csv` anywhere below the root
    Glob,
    /// Also every `SampleSheet.csv` down to --max-depth
    Walk,
}

#[derive(Parser)]
#[command(name = "SampleSheet Sync")]
#[command(about = "Periodically merge new sequencing SampleSheet.csv files into one sheet per sequencing date")]
#[command(version)]
struct Cli {
    #[arg(short, long, help = "Folder containing one subfolder per sequencing run", required = true)]
    root: PathBuf,

    #[arg(short, long, default_value = "samplesheet_sync_config", help = "Folder holding the index and output by default")]
    config_dir: PathBuf,

    #[arg(long, help = "Index of processed sheets [default: <config-dir>/indexed.samplesheets.txt]")]
    index_file: Option<PathBuf>,

    #[arg(short, long, help = "Parent folder of per-run output [default: <config-dir>/sync_files]")]
    output_root: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = DateStrategy::Auto, help = "How the sequencing date of a sheet is derived")]
    date_strategy: DateStrategy,

    #[arg(short, long, value_enum, default_value_t = SearchKind::Expected, help = "Where to look for sheets")]
    search: SearchKind,

    #[arg(long, default_value_t = DEFAULT_WALK_DEPTH, help = "Maximum depth for --search walk")]
    max_depth: usize,

    #[arg(short, long, value_enum, default_value_t = ExtraColumnPolicy::Reject, help = "Handling of rows with more than the known columns")]
    extra_columns: ExtraColumnPolicy,

    #[arg(long, default_value = "86400", help = "Seconds between the starts of two runs")]
    wait_secs: u64,

    #[arg(long, default_value = "3600", help = "Seconds between progress messages while waiting")]
    poll_secs: u64,

    #[arg(long, help = "Run once and exit instead of scheduling")]
    once: bool,

    #[arg(short, long, default_value = "INFO", help = "Logging level (DEBUG, INFO, WARN, ERROR)")]
    log_level: String,
}

impl Cli {
    fn finder_config(&self) -> FinderConfig {
        let mut config = FinderConfig::in_config_dir(&self.config_dir)
            .with_date_strategy(self.date_strategy)
            .with_extra_columns(self.extra_columns)
            .with_search(match self.search {
                SearchKind::Expected => SearchMode::Expected,
                SearchKind::Glob => SearchMode::Glob,
                SearchKind::Walk => SearchMode::Walk { max_depth: self.max_depth },
            });
        if let Some(index_file) = &self.index_file {
            config.index_file = index_file.clone();
        }
        if let Some(output_root) = &self.output_root {
            config.output_root = output_root.clone();
        }
        config
    }

    fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            wait: Duration::from_secs(self.wait_secs),
            poll: Duration::from_secs(self.poll_secs.max(1)),
        }
    }
}

fn setup_logging(log_level_str: &str) -> Result<()> {
    let log_level = match log_level_str.to_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARN" | "WARNING" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        other => {
            eprintln!("Invalid log level '{}', defaulting to INFO.", other);
            LevelFilter::Info
        }
    };

    SimpleLogger::new()
        .with_level(log_level)
        .with_timestamp_format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .init()?;

    Ok(())
}

fn setup_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, stopping after the current run...");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install the Ctrl+C handler")?;
    Ok(shutdown)
}

fn print_run_summary(start_time: Instant, summary: &RunSummary) {
    info!("-------------------- RUN SUMMARY --------------------");
    info!("Run time: {:.2?}", start_time.elapsed());
    info!("Expected sheets found: {}", summary.defined);
    info!("Folders missing a sheet: {}", summary.missing);
    if summary.recursive > 0 {
        info!("Sheets found recursively: {}", summary.recursive);
    }
    info!("New sheets selected: {}", summary.selected);
    if summary.unreadable > 0 {
        warn!("Unreadable sheets: {}", summary.unreadable);
    }
    if summary.unparsed > 0 {
        warn!("Sheets without a sequencing date: {}", summary.unparsed);
    }
    for path in &summary.written {
        info!("  - {}", path.display());
    }
    info!("Sheets added to the index: {}", summary.indexed);
    info!("Report written to: {}", summary.report.display());
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;

    let finder = SampleSheetFinder::new(cli.finder_config());
    info!("Index file: {}", finder.config().index_file.display());
    info!("Output root: {}", finder.config().output_root.display());

    let run_once = || -> Result<()> {
        let start_time = Instant::now();
        let summary = finder.run(&cli.root)?;
        print_run_summary(start_time, &summary);
        Ok(())
    };

    if cli.once {
        return run_once();
    }

    let shutdown = setup_shutdown_flag()?;
    let scheduler = Scheduler::new(cli.scheduler_config(), shutdown);
    scheduler.run(run_once);
    Ok(())
}
