//! HTTP client for a Whisper-compatible transcription endpoint.
//!
//! Uploads an audio artifact as multipart form data to
//! `{api_base}/audio/transcriptions` with `response_format=verbose_json` and
//! maps HTTP failures onto the retryable/fatal error taxonomy.

use crate::defaults;
use crate::error::{MediascribeError, Result};
use crate::transcribe::service::{ResponseSegment, TranscriptionResponse, TranscriptionService};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Wire shape of a `verbose_json` transcription response.
#[derive(Debug, Deserialize)]
struct VerboseJsonResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<VerboseJsonSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseJsonSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Production transcription client.
pub struct WhisperApiClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl WhisperApiClient {
    /// Build a client with the given endpoint, key, and model.
    ///
    /// `request_timeout` bounds the whole upload + transcription round trip.
    pub fn new(
        api_base: &str,
        api_key: &str,
        model: &str,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| MediascribeError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Build a client with the default request timeout.
    pub fn with_defaults(api_base: &str, api_key: &str, model: &str) -> Result<Self> {
        Self::new(
            api_base,
            api_key,
            model,
            Duration::from_secs(defaults::REQUEST_TIMEOUT_SECONDS),
        )
    }
}

/// Classify an HTTP status: retryable (rate limit, server trouble) or fatal.
fn classify_status(status: StatusCode, body: &str) -> MediascribeError {
    let message = format!("{}: {}", status, body.chars().take(300).collect::<String>());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        MediascribeError::TranscriptionRetryable { message }
    } else {
        MediascribeError::TranscriptionFatal { message }
    }
}

#[async_trait]
impl TranscriptionService for WhisperApiClient {
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<TranscriptionResponse> {
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("chunk.mp3")
            .to_string();
        let bytes = tokio::fs::read(audio).await?;
        debug!(audio = %audio.display(), bytes = bytes.len(), "uploading chunk");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| MediascribeError::Other(format!("Invalid mime type: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json".to_string())
            .text("language", language.to_string());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.api_base))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                // Connection resets and timeouts are transient by nature.
                MediascribeError::TranscriptionRetryable {
                    message: format!("request failed: {}", e),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: VerboseJsonResponse = response.json().await.map_err(|e| {
            MediascribeError::TranscriptionFatal {
                message: format!("unparseable response: {}", e),
            }
        })?;

        Ok(TranscriptionResponse {
            text: parsed.text,
            segments: parsed
                .segments
                .into_iter()
                .map(|s| ResponseSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
            language: parsed.language,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
