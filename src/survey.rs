//! Directory survey: discover media files and enqueue them as pending work.

use crate::error::Result;
use crate::extract::probe::MediaProber;
use crate::ledger::SqliteLedger;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extensions considered media worth transcribing.
const MEDIA_EXTENSIONS: &[&str] = &[
    // video containers
    "mp4", "mov", "avi", "mkv", "m4v", "mpg", "mpeg", "wmv", "flv", "webm", "mts", "m2ts",
    // audio
    "mp3", "wav", "m4a", "aac", "flac", "ogg",
];

/// Totals from one survey pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurveyReport {
    /// Media files found under the root.
    pub discovered: u64,
    /// Newly enqueued as pending.
    pub enqueued: u64,
    /// Already present in the ledger (any status); left untouched.
    pub already_tracked: u64,
    /// Files that could not be probed; not enqueued.
    pub probe_failures: u64,
}

/// True if `path` looks like a media file we can transcribe.
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            MEDIA_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Recursively collect media files under `root`, skipping hidden entries.
///
/// Results are sorted so survey order (and therefore queue order) is stable
/// across runs.
pub fn collect_media_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(root, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let hidden = entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false);
        if hidden {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&path, found)?;
        } else if file_type.is_file() && is_media_file(&path) {
            found.push(path);
        }
    }
    Ok(())
}

/// Survey `root`: probe every media file and enqueue new ones as pending.
///
/// Existing ledger entries are never reset, so re-surveying after adding
/// files to the archive only picks up the additions. A file that fails to
/// probe is logged and skipped rather than failing the survey.
pub async fn survey_directory(
    root: &Path,
    prober: &dyn MediaProber,
    ledger: &SqliteLedger,
) -> Result<SurveyReport> {
    let files = collect_media_files(root)?;
    info!(root = %root.display(), count = files.len(), "surveying media files");

    let mut report = SurveyReport {
        discovered: files.len() as u64,
        ..Default::default()
    };

    for path in files {
        let item = match prober.probe(&path).await {
            Ok(item) => item,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "probe failed, skipping");
                report.probe_failures += 1;
                continue;
            }
        };
        if ledger.enqueue(&item)? {
            debug!(
                path = %path.display(),
                minutes = item.duration_seconds / 60.0,
                mb = item.size_bytes / (1024 * 1024),
                "enqueued"
            );
            report.enqueued += 1;
        } else {
            report.already_tracked += 1;
        }
    }

    info!(
        enqueued = report.enqueued,
        already_tracked = report.already_tracked,
        probe_failures = report.probe_failures,
        "survey complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::probe::MockProber;
    use crate::ledger::ItemStatus;

    fn touch(path: &Path, bytes: usize) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn recognizes_media_extensions_case_insensitively() {
        assert!(is_media_file(Path::new("/a/clip.mp4")));
        assert!(is_media_file(Path::new("/a/CLIP.MOV")));
        assert!(is_media_file(Path::new("/a/talk.mp3")));
        assert!(!is_media_file(Path::new("/a/notes.txt")));
        assert!(!is_media_file(Path::new("/a/noext")));
    }

    #[test]
    fn collects_recursively_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.mp4"), 1);
        touch(&dir.path().join("nested/deep/clip.mov"), 1);
        touch(&dir.path().join("nested/notes.txt"), 1);
        touch(&dir.path().join(".hidden/secret.mp4"), 1);
        touch(&dir.path().join("._resource.mp4"), 1);

        let files = collect_media_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["nested/deep/clip.mov", "top.mp4"]);
    }

    #[tokio::test]
    async fn survey_enqueues_new_files_only_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp4"), 2048);
        touch(&dir.path().join("b.mov"), 4096);

        let prober = MockProber::new(600.0);
        let ledger = SqliteLedger::in_memory().unwrap();

        let first = survey_directory(dir.path(), &prober, &ledger).await.unwrap();
        assert_eq!(first.discovered, 2);
        assert_eq!(first.enqueued, 2);

        let second = survey_directory(dir.path(), &prober, &ledger).await.unwrap();
        assert_eq!(second.enqueued, 0);
        assert_eq!(second.already_tracked, 2);
        assert_eq!(ledger.counts().unwrap().pending, 2);
    }

    #[tokio::test]
    async fn resurvey_never_resets_completed_items() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp4"), 2048);

        let prober = MockProber::new(600.0);
        let ledger = SqliteLedger::in_memory().unwrap();
        survey_directory(dir.path(), &prober, &ledger).await.unwrap();

        let claimed = ledger.claim_next().unwrap().unwrap();
        ledger
            .mark_completed(
                &claimed.key,
                &crate::transcribe::types::CombinedTranscript::default(),
                &crate::ledger::ResultSummary::default(),
            )
            .unwrap();

        survey_directory(dir.path(), &prober, &ledger).await.unwrap();
        let entry = ledger.entry(&claimed.key).unwrap().unwrap();
        assert_eq!(entry.status, ItemStatus::Completed);
    }

    #[tokio::test]
    async fn probe_failure_skips_the_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("good.mp4"), 2048);
        // Zero duration makes MediaItem enqueueable but a prober rejecting
        // the file entirely is the interesting case: use a missing file via
        // a dangling entry instead.
        let dangling = dir.path().join("gone.mp4");
        touch(&dangling, 1);

        struct FlakyProber;
        #[async_trait::async_trait]
        impl MediaProber for FlakyProber {
            async fn probe(&self, path: &Path) -> Result<crate::media::MediaItem> {
                if path.file_name().and_then(|n| n.to_str()) == Some("gone.mp4") {
                    Err(crate::error::MediascribeError::ProbeFailed {
                        path: path.display().to_string(),
                        message: "no streams".to_string(),
                    })
                } else {
                    Ok(crate::media::MediaItem::new(path, 60.0, 1024))
                }
            }
        }

        let ledger = SqliteLedger::in_memory().unwrap();
        let report = survey_directory(dir.path(), &FlakyProber, &ledger).await.unwrap();
        assert_eq!(report.discovered, 2);
        assert_eq!(report.enqueued, 1);
        assert_eq!(report.probe_failures, 1);
    }
}
