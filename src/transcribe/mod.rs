//! Transcription: service trait, HTTP client, and the chunk merger.

pub mod merger;
pub mod service;
pub mod types;
pub mod whisper_api;

pub use merger::{MergeReport, TranscriptionMerger};
pub use service::{TranscriptionResponse, TranscriptionService};
pub use types::{CombinedTranscript, TranscriptSegment};
pub use whisper_api::WhisperApiClient;
