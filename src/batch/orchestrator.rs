//! Sequential batch orchestrator over the ledger-backed work queue.

use crate::batch::progress::ProgressReporter;
use crate::batch::shutdown::ShutdownFlag;
use crate::defaults;
use crate::error::{MediascribeError, Result};
use crate::ledger::{transcription_cost, LedgerEntry, ResultSummary, SqliteLedger};
use crate::media::MediaItem;
use crate::planner::plan_chunks;
use crate::transcribe::merger::TranscriptionMerger;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Queue fully processed; every item is completed or failed.
    Drained,
    /// Stopped early at an item boundary; remaining items stay pending.
    ShutdownComplete,
}

/// End-of-run totals.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub processed: u64,
    pub completed: u64,
    pub failed: u64,
    /// Items put back to pending from a previous interrupted run.
    pub recovered: u32,
}

/// Drives items one at a time: claim, plan, extract, transcribe, record.
///
/// One item's failure never aborts the batch; only losing the ledger does.
pub struct BatchOrchestrator {
    ledger: Arc<SqliteLedger>,
    merger: TranscriptionMerger,
    shutdown: ShutdownFlag,
    size_ceiling_bytes: u64,
    safety_margin: f64,
    min_chunk_seconds: u32,
    item_pacing: Duration,
    report_every: u64,
}

impl BatchOrchestrator {
    pub fn new(ledger: Arc<SqliteLedger>, merger: TranscriptionMerger, shutdown: ShutdownFlag) -> Self {
        Self {
            ledger,
            merger,
            shutdown,
            size_ceiling_bytes: defaults::SIZE_CEILING_BYTES,
            safety_margin: defaults::SAFETY_MARGIN,
            min_chunk_seconds: defaults::MIN_CHUNK_SECONDS,
            item_pacing: Duration::from_millis(defaults::ITEM_PACING_MS),
            report_every: defaults::REPORT_EVERY_ITEMS,
        }
    }

    pub fn with_size_ceiling(mut self, ceiling_bytes: u64) -> Self {
        self.size_ceiling_bytes = ceiling_bytes;
        self
    }

    pub fn with_safety_margin(mut self, margin: f64) -> Self {
        self.safety_margin = margin;
        self
    }

    pub fn with_min_chunk_seconds(mut self, seconds: u32) -> Self {
        self.min_chunk_seconds = seconds;
        self
    }

    pub fn with_item_pacing(mut self, pacing: Duration) -> Self {
        self.item_pacing = pacing;
        self
    }

    pub fn with_report_every(mut self, items: u64) -> Self {
        self.report_every = items;
        self
    }

    /// Process the queue until drained or shutdown is requested.
    ///
    /// Interrupted items from a previous run are recovered to pending before
    /// claiming begins, so a restart resumes exactly where the kill landed.
    pub async fn run(&self) -> Result<RunReport> {
        let recovered = self.ledger.recover_interrupted()?;
        let pending = self.ledger.counts()?.pending;
        info!(pending, recovered, "starting batch run");

        let mut progress = ProgressReporter::new(pending, self.report_every);
        let outcome = loop {
            // Shutdown is observed only here, never mid-item.
            if self.shutdown.is_requested() {
                break RunOutcome::ShutdownComplete;
            }

            let Some(entry) = self.ledger.claim_next()? else {
                break RunOutcome::Drained;
            };

            match self.process_item(&entry).await {
                Ok(summary) => {
                    info!(
                        key = %entry.key,
                        chunks = summary.chunk_count,
                        words = summary.word_count,
                        cost_usd = summary.cost_usd,
                        "item completed"
                    );
                    progress.record(true);
                }
                Err(e) if e.is_ledger() => return Err(e),
                Err(e) => {
                    warn!(key = %entry.key, error = %e, "item failed");
                    self.ledger.mark_failed(&entry.key, &e.to_string())?;
                    progress.record(false);
                }
            }

            if !self.item_pacing.is_zero() && !self.shutdown.is_requested() {
                tokio::time::sleep(self.item_pacing).await;
            }
        };

        progress.finish();
        self.report_failed_items()?;

        Ok(RunReport {
            outcome,
            processed: progress.processed(),
            completed: progress.completed(),
            failed: progress.failed(),
            recovered,
        })
    }

    /// Plan, transcribe, and record one claimed item.
    async fn process_item(&self, entry: &LedgerEntry) -> Result<ResultSummary> {
        let item = MediaItem::new(&entry.key, entry.duration_seconds, entry.size_bytes);
        let plan = plan_chunks(
            item.size_bytes,
            item.duration_seconds,
            self.size_ceiling_bytes,
            self.safety_margin,
            self.min_chunk_seconds,
        )?;

        if !plan.is_single() {
            info!(
                key = %item.key(),
                chunks = plan.chunk_count,
                chunk_minutes = plan.chunk_duration_seconds / 60.0,
                "item exceeds size ceiling, splitting"
            );
        }

        let merge = self.merger.transcribe_item(&item, &plan).await?;
        let summary = ResultSummary {
            chunk_count: merge.chunk_count,
            retries: merge.retries,
            word_count: merge.transcript.word_count(),
            character_count: merge.transcript.character_count(),
            cost_usd: transcription_cost(item.duration_seconds),
            language: merge.transcript.language.clone(),
            model: self.merger.model_name(),
        };

        self.ledger
            .mark_completed(&item.key(), &merge.transcript, &summary)?;
        Ok(summary)
    }

    fn report_failed_items(&self) -> Result<()> {
        let failed = self.ledger.failed_entries()?;
        if failed.is_empty() {
            return Ok(());
        }
        error!("{} item(s) failed; re-queue them with `retry-failed`", failed.len());
        for entry in failed {
            error!(
                key = %entry.key,
                attempts = entry.attempts,
                error = entry.last_error.as_deref().unwrap_or("unknown"),
                "failed item"
            );
        }
        Ok(())
    }
}
