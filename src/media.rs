//! Media item metadata and size-rate estimation.

use crate::error::{MediascribeError, Result};
use std::path::PathBuf;

/// A surveyed media file: the unit of work for the batch pipeline.
///
/// Immutable once surveyed. The source path is the unique key everywhere —
/// in the ledger, in transcripts, and in operator-facing output.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    /// Absolute path to the original media file.
    pub source_path: PathBuf,
    /// Total duration in seconds.
    pub duration_seconds: f64,
    /// Measured or estimated size of the audio track in bytes.
    pub size_bytes: u64,
}

impl MediaItem {
    pub fn new(source_path: impl Into<PathBuf>, duration_seconds: f64, size_bytes: u64) -> Self {
        Self {
            source_path: source_path.into(),
            duration_seconds,
            size_bytes,
        }
    }

    /// Average bytes-per-second rate for this item.
    pub fn bytes_per_second(&self) -> Result<f64> {
        estimate_bytes_per_second(self.size_bytes, self.duration_seconds).map_err(|_| {
            MediascribeError::InvalidDuration {
                path: self.source_path.display().to_string(),
            }
        })
    }

    /// Source path rendered for ledger keys and log output.
    pub fn key(&self) -> String {
        self.source_path.display().to_string()
    }
}

/// Derive an average bytes-per-second rate from whole-file size and duration.
///
/// Pure function. A zero or negative duration is an error: the caller must
/// fail the item rather than divide by zero.
pub fn estimate_bytes_per_second(total_size_bytes: u64, total_duration_seconds: f64) -> Result<f64> {
    if total_duration_seconds <= 0.0 || !total_duration_seconds.is_finite() {
        return Err(MediascribeError::InvalidDuration {
            path: String::new(),
        });
    }
    Ok(total_size_bytes as f64 / total_duration_seconds)
}
