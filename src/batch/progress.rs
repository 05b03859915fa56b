//! Progress and ETA reporting for long batch runs.
//!
//! Purely observational; never part of correctness.

use std::time::{Duration, Instant};
use tracing::info;

/// Tracks throughput over a run and logs a progress line every N items.
#[derive(Debug)]
pub struct ProgressReporter {
    started: Instant,
    total: u64,
    processed: u64,
    completed: u64,
    failed: u64,
    report_every: u64,
}

impl ProgressReporter {
    pub fn new(total: u64, report_every: u64) -> Self {
        Self {
            started: Instant::now(),
            total,
            processed: 0,
            completed: 0,
            failed: 0,
            report_every: report_every.max(1),
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Record one finished item and emit a progress line when due.
    pub fn record(&mut self, success: bool) {
        self.processed += 1;
        if success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }

        if self.processed % self.report_every == 0 && self.processed < self.total {
            self.report();
        }
    }

    /// Estimated time remaining at the observed rate.
    pub fn eta(&self) -> Option<Duration> {
        if self.processed == 0 || self.total <= self.processed {
            return None;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let per_item = elapsed / self.processed as f64;
        let remaining = (self.total - self.processed) as f64 * per_item;
        Some(Duration::from_secs(remaining as u64))
    }

    fn report(&self) {
        let elapsed = Duration::from_secs(self.started.elapsed().as_secs());
        match self.eta() {
            Some(eta) => info!(
                "progress: {}/{} items ({} failed), elapsed {}, eta {}",
                self.processed,
                self.total,
                self.failed,
                humantime::format_duration(elapsed),
                humantime::format_duration(eta),
            ),
            None => info!(
                "progress: {}/{} items ({} failed), elapsed {}",
                self.processed,
                self.total,
                self.failed,
                humantime::format_duration(elapsed),
            ),
        }
    }

    /// Log the end-of-run totals.
    pub fn finish(&self) {
        let elapsed = Duration::from_secs(self.started.elapsed().as_secs());
        info!(
            "run finished: {} completed, {} failed, {} of {} processed in {}",
            self.completed,
            self.failed,
            self.processed,
            self.total,
            humantime::format_duration(elapsed),
        );
    }
}
