//! Collects per-run `SampleSheet.csv` files from a sequencing data folder,
//! skips the ones already recorded in an append-only index, and merges the new
//! ones into one sheet per sequencing date.

pub mod config;
pub mod dedup;
pub mod error;
pub mod finder;
pub mod index;
pub mod locator;
pub mod organizer;
pub mod output;
pub mod report;
pub mod scheduler;
pub mod sheet;

pub use config::{DateStrategy, ExtraColumnPolicy, FinderConfig, SchedulerConfig, SearchMode};
pub use error::SheetError;
pub use finder::{RunSummary, SampleSheetFinder};
pub use scheduler::Scheduler;
