//! Durable progress ledger.
//!
//! The ledger is the single source of truth for "has this item been done".
//! Every status transition commits on its own, so an interruption at any
//! point leaves at most the in-flight item needing reprocessing.

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteLedger;

use crate::defaults;
use chrono::{DateTime, Utc};

/// Lifecycle status of one ledger item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ItemStatus::Pending),
            "in_progress" => Some(ItemStatus::InProgress),
            "completed" => Some(ItemStatus::Completed),
            "failed" => Some(ItemStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item's row in the ledger.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    /// Source path; the unique key.
    pub key: String,
    pub status: ItemStatus,
    pub duration_seconds: f64,
    pub size_bytes: u64,
    /// Times this item has been claimed for processing.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub cost_usd: f64,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Outcome details recorded when an item completes.
#[derive(Debug, Clone, Default)]
pub struct ResultSummary {
    pub chunk_count: u32,
    /// Chunk-level retries absorbed on the way to success.
    pub retries: u32,
    pub word_count: usize,
    pub character_count: usize,
    pub cost_usd: f64,
    pub language: String,
    pub model: String,
}

/// Per-status item counts, for progress and status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub failed: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.in_progress + self.completed + self.failed
    }

    /// True when no item is waiting or in flight.
    pub fn is_drained(&self) -> bool {
        self.pending == 0 && self.in_progress == 0
    }
}

/// Estimated transcription cost for a span of audio, in dollars.
pub fn transcription_cost(duration_seconds: f64) -> f64 {
    (duration_seconds / 60.0) * defaults::COST_PER_MINUTE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ItemStatus::Pending,
            ItemStatus::InProgress,
            ItemStatus::Completed,
            ItemStatus::Failed,
        ] {
            assert_eq!(ItemStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ItemStatus::parse("bogus"), None);
    }

    #[test]
    fn counts_drain_when_nothing_waits() {
        let counts = StatusCounts {
            pending: 0,
            in_progress: 0,
            completed: 7,
            failed: 2,
        };
        assert!(counts.is_drained());
        assert_eq!(counts.total(), 9);

        let busy = StatusCounts {
            pending: 1,
            ..counts
        };
        assert!(!busy.is_drained());
    }

    #[test]
    fn cost_is_per_minute() {
        // 50 minutes at $0.006/min.
        let cost = transcription_cost(3000.0);
        assert!((cost - 0.30).abs() < 1e-9);
    }
}
