//! Chunk-by-chunk transcription and offset-merge into one transcript.

use crate::defaults;
use crate::error::{MediascribeError, Result};
use crate::extract::ChunkExtractor;
use crate::media::MediaItem;
use crate::planner::{ChunkPlan, ChunkSpan};
use crate::transcribe::service::TranscriptionService;
use crate::transcribe::types::{CombinedTranscript, TranscriptSegment};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of merging one item's chunks.
#[derive(Debug)]
pub struct MergeReport {
    pub transcript: CombinedTranscript,
    /// Chunks actually processed.
    pub chunk_count: u32,
    /// Chunk-level retries that were absorbed on the way to success.
    pub retries: u32,
}

/// Drives extraction and transcription of every chunk of an item, in index
/// order, and stitches the results into one continuous transcript.
///
/// Chunks must be processed 0, 1, 2, … because each chunk's timestamp offset
/// is its cumulative start on the item's timeline.
pub struct TranscriptionMerger {
    extractor: Arc<dyn ChunkExtractor>,
    service: Arc<dyn TranscriptionService>,
    work_dir: PathBuf,
    language: String,
    chunk_pacing: Duration,
    extraction_attempts: u32,
    transcription_attempts: u32,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl TranscriptionMerger {
    pub fn new(
        extractor: Arc<dyn ChunkExtractor>,
        service: Arc<dyn TranscriptionService>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            service,
            work_dir: work_dir.into(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            chunk_pacing: Duration::from_millis(defaults::CHUNK_PACING_MS),
            extraction_attempts: defaults::EXTRACTION_ATTEMPTS,
            transcription_attempts: defaults::TRANSCRIPTION_ATTEMPTS,
            backoff_base: Duration::from_millis(defaults::BACKOFF_BASE_MS),
            backoff_cap: Duration::from_millis(defaults::BACKOFF_CAP_MS),
        }
    }

    /// Model name of the underlying service, for result records.
    pub fn model_name(&self) -> String {
        self.service.model_name().to_string()
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_chunk_pacing(mut self, pacing: Duration) -> Self {
        self.chunk_pacing = pacing;
        self
    }

    pub fn with_extraction_attempts(mut self, attempts: u32) -> Self {
        self.extraction_attempts = attempts.max(1);
        self
    }

    pub fn with_transcription_attempts(mut self, attempts: u32) -> Self {
        self.transcription_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Transcribe every chunk of `item` per `plan` and merge the results.
    ///
    /// Any chunk failure that survives its retry policy fails the whole item;
    /// partial progress is discarded, never returned as a transcript.
    pub async fn transcribe_item(&self, item: &MediaItem, plan: &ChunkPlan) -> Result<MergeReport> {
        let mut segments: Vec<TranscriptSegment> = Vec::new();
        let mut fragments: Vec<String> = Vec::new();
        let mut language: Option<String> = None;
        let mut retries = 0u32;

        for span in plan.chunks() {
            if plan.chunk_count > 1 {
                info!(
                    chunk = span.index + 1,
                    of = plan.chunk_count,
                    start_min = span.start_seconds / 60.0,
                    span_min = span.span_seconds / 60.0,
                    "processing chunk"
                );
            }

            // The temp file owns the artifact: dropped (and deleted) at the
            // end of this iteration on success and failure paths alike.
            let artifact_file = tempfile::Builder::new()
                .prefix("mediascribe-chunk-")
                .suffix(".mp3")
                .tempfile_in(&self.work_dir)?;
            let artifact_path = artifact_file.path().to_path_buf();

            retries += self.extract_with_retry(item, &span, &artifact_path).await?;

            let (response, transcribe_retries) =
                self.transcribe_with_retry(&artifact_path, &span).await?;
            retries += transcribe_retries;

            if language.is_none() {
                language = response.language.clone();
            }

            if response.segments.is_empty() {
                let text = response.text.trim();
                if !text.is_empty() {
                    fragments.push(text.to_string());
                }
            } else {
                for segment in &response.segments {
                    segments.push(TranscriptSegment {
                        start_seconds: segment.start + span.start_seconds,
                        end_seconds: segment.end + span.start_seconds,
                        text: segment.text.trim().to_string(),
                    });
                    let text = segment.text.trim();
                    if !text.is_empty() {
                        fragments.push(text.to_string());
                    }
                }
            }

            if span.index + 1 < plan.chunk_count && !self.chunk_pacing.is_zero() {
                tokio::time::sleep(self.chunk_pacing).await;
            }
        }

        let transcript = CombinedTranscript {
            text: fragments.join(" "),
            segments,
            language: language.unwrap_or_else(|| self.language.clone()),
        };

        // Offsets are monotone in chunk index and the service returns ordered
        // segments, so a regression here means a merge bug, not bad input.
        if !transcript.is_monotonic() {
            return Err(MediascribeError::Other(format!(
                "merged segments for {} are out of order",
                item.key()
            )));
        }

        Ok(MergeReport {
            transcript,
            chunk_count: plan.chunk_count,
            retries,
        })
    }

    /// Extract one chunk, retrying bounded times on recoverable failures.
    ///
    /// Returns the number of retries absorbed. Size violations and missing
    /// tools are never retried.
    async fn extract_with_retry(
        &self,
        item: &MediaItem,
        span: &ChunkSpan,
        output: &std::path::Path,
    ) -> Result<u32> {
        let mut retries = 0u32;
        for attempt in 1..=self.extraction_attempts {
            match self
                .extractor
                .extract(&item.source_path, span.start_seconds, span.span_seconds, output)
                .await
            {
                Ok(_) => return Ok(retries),
                Err(e) if e.is_retryable() && attempt < self.extraction_attempts => {
                    warn!(
                        chunk = span.index,
                        attempt,
                        error = %e,
                        "chunk extraction failed, retrying"
                    );
                    retries += 1;
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("extraction loop always returns");
    }

    /// Submit one chunk, with bounded exponential backoff on retryable errors.
    async fn transcribe_with_retry(
        &self,
        audio: &std::path::Path,
        span: &ChunkSpan,
    ) -> Result<(crate::transcribe::service::TranscriptionResponse, u32)> {
        let mut retries = 0u32;
        for attempt in 1..=self.transcription_attempts {
            match self.service.transcribe(audio, &self.language).await {
                Ok(response) => return Ok((response, retries)),
                Err(e) if e.is_retryable() && attempt < self.transcription_attempts => {
                    let delay = backoff_delay(attempt, self.backoff_base, self.backoff_cap);
                    warn!(
                        chunk = span.index,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transcription failed, backing off"
                    );
                    retries += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("transcription loop always returns");
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped.
fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
    base.saturating_mul(factor).min(cap)
}
