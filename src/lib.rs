//! mediascribe - Resumable batch transcription for oversized media archives
//!
//! Splits media whose audio exceeds the transcription service's size ceiling
//! into bounded chunks, transcribes each chunk, and stitches the results back
//! into one continuous transcript. A SQLite ledger makes multi-hour runs
//! crash-safe and resumable.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod batch;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod logging;
pub mod media;
pub mod planner;
pub mod survey;
pub mod transcribe;

pub use batch::{BatchOrchestrator, RunOutcome, ShutdownFlag};
pub use config::Config;
pub use error::{MediascribeError, Result};
pub use ledger::SqliteLedger;
pub use media::MediaItem;
pub use planner::{plan_chunks, ChunkPlan};
pub use transcribe::{CombinedTranscript, TranscriptionMerger};
