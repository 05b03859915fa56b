//! Error types for mediascribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediascribeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Planning errors — fatal to the item, no retry
    #[error("Cannot plan chunks for {path}: duration is zero or unknown")]
    InvalidDuration { path: String },

    // Probe errors
    #[error("Failed to probe {path}: {message}")]
    ProbeFailed { path: String, message: String },

    // Extraction errors — retried a bounded number of times per chunk
    #[error("Audio extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("Audio extraction timed out after {seconds}s")]
    ExtractionTimeout { seconds: u64 },

    #[error("Extraction tool not found: {tool}")]
    ExtractionToolNotFound { tool: String },

    // Fatal to the item: the size-rate estimate was wrong, a retry won't help
    #[error("Extracted chunk is {measured_bytes} bytes, at or over the {ceiling_bytes} byte ceiling")]
    SizeViolation {
        measured_bytes: u64,
        ceiling_bytes: u64,
    },

    // Transcription service errors
    #[error("Transcription request failed (retryable): {message}")]
    TranscriptionRetryable { message: String },

    #[error("Transcription request rejected: {message}")]
    TranscriptionFatal { message: String },

    // Ledger errors — fatal to the whole run
    #[error("Ledger error: {0}")]
    Ledger(#[from] rusqlite::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl MediascribeError {
    /// True for errors worth retrying at the chunk level.
    ///
    /// Size violations are deliberately excluded: the rate estimate was
    /// optimistic and re-running the same extraction produces the same bytes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MediascribeError::ExtractionFailed { .. }
                | MediascribeError::ExtractionTimeout { .. }
                | MediascribeError::TranscriptionRetryable { .. }
        )
    }

    /// True if the error means the durable ledger itself is unavailable.
    ///
    /// These are the only errors allowed to terminate a batch run.
    pub fn is_ledger(&self) -> bool {
        matches!(self, MediascribeError::Ledger(_))
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, MediascribeError>;
