use crate::config::SchedulerConfig;
use anyhow::Result;
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep, so a shutdown request is noticed quickly.
const SLEEP_SLICE: Duration = Duration::from_secs(1);

/// Repeats a job every `wait`, until the shutdown flag is raised.
///
/// The flag is checked between runs and while waiting; a run that has started
/// always finishes. A failed run is logged and retried on the next cycle.
pub struct Scheduler {
    config: SchedulerConfig,
    shutdown: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, shutdown: Arc<AtomicBool>) -> Self {
        Self { config, shutdown }
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Returns the number of runs started.
    pub fn run<F>(&self, mut job: F) -> usize
    where
        F: FnMut() -> Result<()>,
    {
        let mut runs = 0;
        while !self.stopping() {
            info!("Starting the scheduled scraping process...");
            let start = Instant::now();
            runs += 1;
            if let Err(e) = job() {
                error!("Run {} failed: {:#}", runs, e);
            }
            if !self.wait_from(start) {
                break;
            }
        }
        info!("Scheduler stopped after {} runs.", runs);
        runs
    }

    /// Sleeps until `wait` has elapsed since `start`. False if shutdown was requested.
    fn wait_from(&self, start: Instant) -> bool {
        // None when the next report time overflows Instant
        let mut next_report = Some(Instant::now());
        loop {
            if self.stopping() {
                return false;
            }
            let elapsed = start.elapsed();
            if elapsed >= self.config.wait {
                return true;
            }
            let remaining = self.config.wait - elapsed;
            if next_report.is_some_and(|at| Instant::now() >= at) {
                info!(
                    "Sleeping for {} seconds, {:.1} seconds remain.",
                    self.config.wait.as_secs(),
                    remaining.as_secs_f64()
                );
                next_report = Instant::now().checked_add(self.config.poll);
            }
            thread::sleep(remaining.min(self.config.poll).min(SLEEP_SLICE));
        }
    }
}
