//! Media metadata probing via ffprobe.

use crate::defaults;
use crate::error::{MediascribeError, Result};
use crate::media::MediaItem;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Trait for reading a media file's duration and size.
#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Probe `path` and return its surveyed metadata.
    async fn probe(&self, path: &Path) -> Result<MediaItem>;
}

/// Production prober shelling out to ffprobe.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    timeout: Duration,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new()
    }
}

impl FfprobeProber {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(defaults::PROBE_TIMEOUT_SECONDS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Parse ffprobe's `format=duration` output into seconds.
fn parse_duration(stdout: &str) -> Option<f64> {
    let value: f64 = stdout.trim().parse().ok()?;
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<MediaItem> {
        let size_bytes = std::fs::metadata(path)?.len();

        let mut command = tokio::process::Command::new("ffprobe");
        command
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| MediascribeError::ProbeFailed {
                path: path.display().to_string(),
                message: format!("ffprobe timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediascribeError::ExtractionToolNotFound {
                        tool: "ffprobe".to_string(),
                    }
                } else {
                    MediascribeError::ProbeFailed {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(MediascribeError::ProbeFailed {
                path: path.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration_seconds =
            parse_duration(&stdout).ok_or_else(|| MediascribeError::ProbeFailed {
                path: path.display().to_string(),
                message: format!("unparseable duration: {:?}", stdout.trim()),
            })?;

        Ok(MediaItem::new(path, duration_seconds, size_bytes))
    }
}

/// Mock prober for testing: fixed duration, size from the filesystem.
#[derive(Debug, Clone)]
pub struct MockProber {
    duration_seconds: f64,
}

impl MockProber {
    pub fn new(duration_seconds: f64) -> Self {
        Self { duration_seconds }
    }
}

#[async_trait]
impl MediaProber for MockProber {
    async fn probe(&self, path: &Path) -> Result<MediaItem> {
        let size_bytes = std::fs::metadata(path)?.len();
        Ok(MediaItem::new(path, self.duration_seconds, size_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_seconds() {
        assert_eq!(parse_duration("3000.213000\n"), Some(3000.213));
    }

    #[test]
    fn rejects_garbage_and_zero() {
        assert_eq!(parse_duration("N/A"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("0.0"), None);
        assert_eq!(parse_duration("-1"), None);
    }

    #[tokio::test]
    async fn mock_prober_reads_size_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, vec![0u8; 2048]).unwrap();

        let prober = MockProber::new(120.0);
        let item = prober.probe(&file).await.unwrap();
        assert_eq!(item.duration_seconds, 120.0);
        assert_eq!(item.size_bytes, 2048);
    }

    #[tokio::test]
    async fn mock_prober_missing_file_is_io_error() {
        let prober = MockProber::new(1.0);
        assert!(prober.probe(Path::new("/nonexistent/x.mp4")).await.is_err());
    }
}
