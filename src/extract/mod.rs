//! Bounded-time audio extraction from original media sources.

pub mod ffmpeg;
pub mod probe;

use crate::error::{MediascribeError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A materialized chunk of audio with its measured size.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkArtifact {
    /// Path of the produced audio file.
    pub path: PathBuf,
    /// Measured size in bytes, verified against the ceiling by the extractor.
    pub size_bytes: u64,
}

/// Trait for extracting one chunk's audio from an original media source.
///
/// This trait allows swapping implementations (real ffmpeg vs mock).
#[async_trait]
pub trait ChunkExtractor: Send + Sync {
    /// Extract `[start_seconds, start_seconds + span_seconds)` of audio from
    /// `source` into `output`.
    ///
    /// Implementations must verify the produced artifact's size against the
    /// ceiling and return [`MediascribeError::SizeViolation`] if it is at or
    /// over the limit — the check is mandatory, not advisory.
    async fn extract(
        &self,
        source: &Path,
        start_seconds: f64,
        span_seconds: f64,
        output: &Path,
    ) -> Result<ChunkArtifact>;
}

/// One scripted outcome for [`MockExtractor`].
#[derive(Debug, Clone)]
pub enum MockExtraction {
    /// Write `size_bytes` of zeroes to the output path and succeed.
    Succeed { size_bytes: u64 },
    /// Fail with a retryable extraction error.
    FailRetryable,
    /// Fail with a timeout.
    Timeout,
    /// Fail with a size violation.
    Oversized { measured_bytes: u64, ceiling_bytes: u64 },
}

/// Mock extractor for testing.
///
/// Outcomes are consumed in call order; once the script is exhausted every
/// further call succeeds with a small artifact.
pub struct MockExtractor {
    script: Mutex<Vec<MockExtraction>>,
    calls: AtomicUsize,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue an outcome for the next unscripted call.
    pub fn then(self, outcome: MockExtraction) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push(outcome);
        }
        self
    }

    /// Number of extract calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChunkExtractor for MockExtractor {
    async fn extract(
        &self,
        _source: &Path,
        _start_seconds: f64,
        _span_seconds: f64,
        output: &Path,
    ) -> Result<ChunkArtifact> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = {
            let mut script = self
                .script
                .lock()
                .map_err(|_| MediascribeError::Other("mock script lock poisoned".to_string()))?;
            if script.is_empty() {
                MockExtraction::Succeed { size_bytes: 1024 }
            } else {
                script.remove(0)
            }
        };

        match outcome {
            MockExtraction::Succeed { size_bytes } => {
                std::fs::write(output, vec![0u8; size_bytes as usize])?;
                Ok(ChunkArtifact {
                    path: output.to_path_buf(),
                    size_bytes,
                })
            }
            MockExtraction::FailRetryable => Err(MediascribeError::ExtractionFailed {
                message: "mock extraction failure".to_string(),
            }),
            MockExtraction::Timeout => Err(MediascribeError::ExtractionTimeout { seconds: 600 }),
            MockExtraction::Oversized {
                measured_bytes,
                ceiling_bytes,
            } => Err(MediascribeError::SizeViolation {
                measured_bytes,
                ceiling_bytes,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_succeeds_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("chunk.mp3");
        let extractor = MockExtractor::new();

        let artifact = extractor
            .extract(Path::new("/src.mov"), 0.0, 60.0, &out)
            .await
            .unwrap();
        assert_eq!(artifact.size_bytes, 1024);
        assert!(out.exists());
        assert_eq!(extractor.call_count(), 1);
    }

    #[tokio::test]
    async fn mock_consumes_script_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("chunk.mp3");
        let extractor = MockExtractor::new()
            .then(MockExtraction::Timeout)
            .then(MockExtraction::Succeed { size_bytes: 7 });

        assert!(matches!(
            extractor.extract(Path::new("/s"), 0.0, 1.0, &out).await,
            Err(MediascribeError::ExtractionTimeout { .. })
        ));
        let artifact = extractor
            .extract(Path::new("/s"), 0.0, 1.0, &out)
            .await
            .unwrap();
        assert_eq!(artifact.size_bytes, 7);
        assert_eq!(extractor.call_count(), 2);
    }

    #[tokio::test]
    async fn mock_reports_size_violation() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("chunk.mp3");
        let extractor = MockExtractor::new().then(MockExtraction::Oversized {
            measured_bytes: 100,
            ceiling_bytes: 50,
        });

        let err = extractor
            .extract(Path::new("/s"), 0.0, 1.0, &out)
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
