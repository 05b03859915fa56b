//! Chunk extraction via ffmpeg with a hard wall-clock timeout.
//!
//! Each chunk is cut directly from the original source with a seek + duration
//! window, never from a previously extracted full-length audio file. That
//! avoids double lossy re-encoding and keeps chunk boundaries exact.

use crate::defaults;
use crate::error::{MediascribeError, Result};
use crate::extract::{ChunkArtifact, ChunkExtractor};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Production extractor shelling out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    ceiling_bytes: u64,
    timeout: Duration,
    sample_rate: u32,
    bitrate_kbps: u32,
}

impl FfmpegExtractor {
    /// Create an extractor that verifies artifacts against `ceiling_bytes`.
    pub fn new(ceiling_bytes: u64) -> Self {
        Self {
            ceiling_bytes,
            timeout: Duration::from_secs(defaults::EXTRACTION_TIMEOUT_SECONDS),
            sample_rate: defaults::AUDIO_SAMPLE_RATE,
            bitrate_kbps: defaults::AUDIO_BITRATE_KBPS,
        }
    }

    /// Override the per-chunk wall-clock timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the ffmpeg argument list for one chunk window.
    ///
    /// `-ss` before `-i` seeks on the demuxer, which is fast and accurate
    /// enough for minute-aligned boundaries. Output is mono 16kHz mp3.
    fn build_args(
        &self,
        source: &Path,
        start_seconds: f64,
        span_seconds: f64,
        output: &Path,
    ) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-ss".to_string(),
            format!("{}", start_seconds),
            "-i".to_string(),
            source.display().to_string(),
            "-t".to_string(),
            format!("{}", span_seconds),
            "-vn".to_string(),
            "-acodec".to_string(),
            "libmp3lame".to_string(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-b:a".to_string(),
            format!("{}k", self.bitrate_kbps),
            output.display().to_string(),
        ]
    }

    /// Check a measured artifact size against the ceiling.
    fn verify_size(&self, measured_bytes: u64) -> Result<()> {
        if measured_bytes >= self.ceiling_bytes {
            return Err(MediascribeError::SizeViolation {
                measured_bytes,
                ceiling_bytes: self.ceiling_bytes,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChunkExtractor for FfmpegExtractor {
    async fn extract(
        &self,
        source: &Path,
        start_seconds: f64,
        span_seconds: f64,
        output: &Path,
    ) -> Result<ChunkArtifact> {
        let args = self.build_args(source, start_seconds, span_seconds, output);
        debug!(source = %source.display(), start_seconds, span_seconds, "running ffmpeg");

        let mut command = tokio::process::Command::new("ffmpeg");
        command.args(&args).kill_on_drop(true);

        let run = command.output();
        let output_result = tokio::time::timeout(self.timeout, run).await.map_err(|_| {
            MediascribeError::ExtractionTimeout {
                seconds: self.timeout.as_secs(),
            }
        })?;

        let process_output = output_result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MediascribeError::ExtractionToolNotFound {
                    tool: "ffmpeg".to_string(),
                }
            } else {
                MediascribeError::ExtractionFailed {
                    message: format!("Failed to execute ffmpeg: {}", e),
                }
            }
        })?;

        if !process_output.status.success() {
            let stderr = String::from_utf8_lossy(&process_output.stderr);
            let summary: String = stderr.trim().chars().take(300).collect();
            return Err(MediascribeError::ExtractionFailed {
                message: format!("ffmpeg exited with {}: {}", process_output.status, summary),
            });
        }

        let size_bytes = std::fs::metadata(output)?.len();
        self.verify_size(size_bytes)?;

        Ok(ChunkArtifact {
            path: output.to_path_buf(),
            size_bytes,
        })
    }
}
