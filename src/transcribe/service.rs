//! The external transcription capability, as a swappable trait.

use crate::error::{MediascribeError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One chunk-relative segment as returned by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSegment {
    /// Start relative to the submitted artifact, in seconds.
    pub start: f64,
    /// End relative to the submitted artifact, in seconds.
    pub end: f64,
    pub text: String,
}

/// A transcription response for one audio artifact.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionResponse {
    /// Whole-artifact text; used when the response carries no segments.
    pub text: String,
    /// Ordered chunk-relative segments with timestamps.
    pub segments: Vec<ResponseSegment>,
    /// Language code reported by the service, if any.
    pub language: Option<String>,
}

/// Trait for submitting one audio artifact for transcription.
///
/// This trait allows swapping implementations (real HTTP API vs mock).
/// Errors are either retryable (timeout, rate limit) or fatal (malformed
/// input, rejected request); see [`MediascribeError::is_retryable`].
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe the audio file at `audio`, requesting segment timestamps.
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<TranscriptionResponse>;

    /// Name of the model behind this service.
    fn model_name(&self) -> &str;
}

/// One scripted outcome for [`MockTranscriptionService`].
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Respond(MockResponse),
    FailRetryable,
    FailFatal,
}

/// Response template used by the mock.
#[derive(Debug, Clone, Default)]
pub struct MockResponse {
    pub text: String,
    /// (start, end, text) triples, chunk-relative.
    pub segments: Vec<(f64, f64, String)>,
}

impl MockResponse {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            segments: Vec::new(),
        }
    }

    pub fn segment(mut self, start: f64, end: f64, text: &str) -> Self {
        self.segments.push((start, end, text.to_string()));
        self
    }
}

/// Mock transcription service for testing.
///
/// Scripted outcomes are consumed in call order; once exhausted, every call
/// returns the default response.
pub struct MockTranscriptionService {
    model_name: String,
    default_response: MockResponse,
    script: Mutex<Vec<MockOutcome>>,
    calls: AtomicUsize,
}

impl MockTranscriptionService {
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            default_response: MockResponse::with_text("mock transcription"),
            script: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Set the response used once the script is exhausted.
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = response;
        self
    }

    /// Queue an outcome for the next unscripted call.
    pub fn then(self, outcome: MockOutcome) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push(outcome);
        }
        self
    }

    /// Number of transcribe calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn build(&self, template: &MockResponse) -> TranscriptionResponse {
        TranscriptionResponse {
            text: template.text.clone(),
            segments: template
                .segments
                .iter()
                .map(|(start, end, text)| ResponseSegment {
                    start: *start,
                    end: *end,
                    text: text.clone(),
                })
                .collect(),
            language: Some("en".to_string()),
        }
    }
}

#[async_trait]
impl TranscriptionService for MockTranscriptionService {
    async fn transcribe(&self, _audio: &Path, _language: &str) -> Result<TranscriptionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = {
            let mut script = self
                .script
                .lock()
                .map_err(|_| MediascribeError::Other("mock script lock poisoned".to_string()))?;
            if script.is_empty() {
                None
            } else {
                Some(script.remove(0))
            }
        };

        match outcome {
            None => Ok(self.build(&self.default_response)),
            Some(MockOutcome::Respond(template)) => Ok(self.build(&template)),
            Some(MockOutcome::FailRetryable) => Err(MediascribeError::TranscriptionRetryable {
                message: "mock rate limit".to_string(),
            }),
            Some(MockOutcome::FailFatal) => Err(MediascribeError::TranscriptionFatal {
                message: "mock rejected request".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn mock_returns_default_response() {
        let service = MockTranscriptionService::new("test-model");
        let response = service
            .transcribe(&PathBuf::from("/a.mp3"), "en")
            .await
            .unwrap();
        assert_eq!(response.text, "mock transcription");
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn mock_plays_script_then_falls_back() {
        let service = MockTranscriptionService::new("m")
            .then(MockOutcome::FailRetryable)
            .then(MockOutcome::Respond(
                MockResponse::with_text("scripted").segment(0.0, 2.0, "scripted"),
            ));
        let audio = PathBuf::from("/a.mp3");

        let first = service.transcribe(&audio, "en").await;
        assert!(matches!(
            first,
            Err(MediascribeError::TranscriptionRetryable { .. })
        ));

        let second = service.transcribe(&audio, "en").await.unwrap();
        assert_eq!(second.text, "scripted");
        assert_eq!(second.segments.len(), 1);

        let third = service.transcribe(&audio, "en").await.unwrap();
        assert_eq!(third.text, "mock transcription");
        assert_eq!(service.call_count(), 3);
    }

    #[tokio::test]
    async fn mock_fatal_is_not_retryable() {
        let service = MockTranscriptionService::new("m").then(MockOutcome::FailFatal);
        let err = service
            .transcribe(&PathBuf::from("/a.mp3"), "en")
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn trait_is_object_safe() {
        let service: Box<dyn TranscriptionService> =
            Box::new(MockTranscriptionService::new("boxed"));
        assert_eq!(service.model_name(), "boxed");
    }
}
