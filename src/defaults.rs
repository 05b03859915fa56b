//! Default configuration constants for mediascribe.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Hard ceiling on the size of an audio artifact submitted for transcription.
///
/// The Whisper API rejects uploads at 25 MB; planning against 24 MiB leaves
/// headroom for container overhead and rounding in the rate estimate.
pub const SIZE_CEILING_BYTES: u64 = 24 * 1024 * 1024;

/// Fractional discount applied to the ceiling when planning chunk durations.
///
/// Absorbs error in the whole-file bytes-per-second estimate; variable-bitrate
/// audio can run denser than the average over any single chunk.
pub const SAFETY_MARGIN: f64 = 0.95;

/// Minimum planned chunk duration in seconds.
///
/// Chunks shorter than 5 minutes are rejected in favor of this floor even if
/// the floor risks exceeding the ceiling slightly; the post-extraction size
/// check is the actual safety net.
pub const MIN_CHUNK_SECONDS: u32 = 300;

/// Granularity for planned chunk boundaries, in seconds.
///
/// Durations are rounded down to whole minutes so boundaries stay
/// human-legible when cross-referencing timestamps against source media.
pub const CHUNK_GRANULARITY_SECONDS: u32 = 60;

/// Audio sample rate for extracted chunks in Hz. 16kHz is the Whisper optimum.
pub const AUDIO_SAMPLE_RATE: u32 = 16_000;

/// Audio bitrate for extracted chunks in kbps. Sufficient for mono speech.
pub const AUDIO_BITRATE_KBPS: u32 = 32;

/// Wall-clock timeout for a single chunk extraction, in seconds.
pub const EXTRACTION_TIMEOUT_SECONDS: u64 = 600;

/// Wall-clock timeout for probing a media file's duration, in seconds.
pub const PROBE_TIMEOUT_SECONDS: u64 = 30;

/// Attempts per chunk extraction before the item is failed.
pub const EXTRACTION_ATTEMPTS: u32 = 3;

/// Attempts per transcription request before the item is failed.
pub const TRANSCRIPTION_ATTEMPTS: u32 = 4;

/// Base delay for exponential backoff between transcription retries, in ms.
pub const BACKOFF_BASE_MS: u64 = 2_000;

/// Cap on the exponential backoff delay, in ms.
pub const BACKOFF_CAP_MS: u64 = 60_000;

/// Pause between chunk submissions, in ms.
///
/// The transcription service is rate limited; one second between uploads keeps
/// a multi-hour batch comfortably under the limit.
pub const CHUNK_PACING_MS: u64 = 1_000;

/// Pause between items, in ms.
pub const ITEM_PACING_MS: u64 = 500;

/// Emit a progress report after this many processed items.
pub const REPORT_EVERY_ITEMS: u64 = 5;

/// Wall-clock timeout for a single transcription HTTP request, in seconds.
pub const REQUEST_TIMEOUT_SECONDS: u64 = 600;

/// Default transcription model name.
pub const DEFAULT_MODEL: &str = "whisper-1";

/// Default language code submitted with each transcription request.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Default API base URL for the transcription service.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Transcription cost per audio minute in dollars, for ledger accounting.
pub const COST_PER_MINUTE: f64 = 0.006;

/// Default ledger database filename.
pub const DEFAULT_DB_FILENAME: &str = "transcripts.db";
