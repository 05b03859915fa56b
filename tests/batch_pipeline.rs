//! End-to-end pipeline tests with a file-backed ledger and mocked
//! extraction/transcription collaborators.

use mediascribe::batch::{BatchOrchestrator, RunOutcome, ShutdownFlag};
use mediascribe::extract::probe::MockProber;
use mediascribe::extract::MockExtractor;
use mediascribe::ledger::{ItemStatus, SqliteLedger};
use mediascribe::survey::survey_directory;
use mediascribe::transcribe::service::{MockResponse, MockTranscriptionService};
use mediascribe::transcribe::TranscriptionMerger;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const MB: u64 = 1024 * 1024;

fn write_media(dir: &Path, name: &str, size: usize) {
    std::fs::write(dir.join(name), vec![0u8; size]).unwrap();
}

fn orchestrator(
    ledger: Arc<SqliteLedger>,
    service: MockTranscriptionService,
    work_dir: &Path,
    shutdown: ShutdownFlag,
) -> BatchOrchestrator {
    let merger = TranscriptionMerger::new(
        Arc::new(MockExtractor::new()),
        Arc::new(service),
        work_dir,
    )
    .with_chunk_pacing(Duration::ZERO);
    BatchOrchestrator::new(ledger, merger, shutdown).with_item_pacing(Duration::ZERO)
}

#[tokio::test]
async fn survey_then_run_produces_persisted_transcripts() {
    let media = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let db = scratch.path().join("ledger.db");

    // A 50-minute item big enough to split, plus a small single-chunk one.
    write_media(media.path(), "big.mov", (30 * MB) as usize);
    std::fs::create_dir_all(media.path().join("sub")).unwrap();
    write_media(&media.path().join("sub"), "small.mp3", 1024);

    let ledger = Arc::new(SqliteLedger::open(&db).unwrap());
    let prober = MockProber::new(3000.0);
    let report = survey_directory(media.path(), &prober, &ledger)
        .await
        .unwrap();
    assert_eq!(report.enqueued, 2);

    let service = MockTranscriptionService::new("whisper-1")
        .with_default_response(MockResponse::with_text("archived words").segment(
            0.0,
            2.0,
            "archived words",
        ));
    let run = orchestrator(ledger.clone(), service, scratch.path(), ShutdownFlag::new())
        .run()
        .await
        .unwrap();

    assert_eq!(run.outcome, RunOutcome::Drained);
    assert_eq!(run.completed, 2);

    let big_key = media.path().join("big.mov").display().to_string();
    let entry = ledger.entry(&big_key).unwrap().unwrap();
    assert_eq!(entry.status, ItemStatus::Completed);
    assert!(ledger.transcript_text(&big_key).unwrap().is_some());

    // No chunk artifacts survive the run.
    let leftovers = std::fs::read_dir(scratch.path())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with("mediascribe-chunk-")
        })
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn second_run_over_the_same_ledger_is_a_no_op() {
    let media = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let db = scratch.path().join("ledger.db");
    write_media(media.path(), "a.mp4", 2048);

    {
        let ledger = Arc::new(SqliteLedger::open(&db).unwrap());
        survey_directory(media.path(), &MockProber::new(600.0), &ledger)
            .await
            .unwrap();
        let run = orchestrator(
            ledger,
            MockTranscriptionService::new("whisper-1"),
            scratch.path(),
            ShutdownFlag::new(),
        )
        .run()
        .await
        .unwrap();
        assert_eq!(run.completed, 1);
    }

    // Fresh process: reopen the ledger, re-survey, rerun.
    let ledger = Arc::new(SqliteLedger::open(&db).unwrap());
    survey_directory(media.path(), &MockProber::new(600.0), &ledger)
        .await
        .unwrap();

    let service = MockTranscriptionService::new("whisper-1");
    let counting = Arc::new(service);
    let merger = TranscriptionMerger::new(
        Arc::new(MockExtractor::new()),
        counting.clone(),
        scratch.path(),
    )
    .with_chunk_pacing(Duration::ZERO);
    let run = BatchOrchestrator::new(ledger, merger, ShutdownFlag::new())
        .with_item_pacing(Duration::ZERO)
        .run()
        .await
        .unwrap();

    assert_eq!(run.outcome, RunOutcome::Drained);
    assert_eq!(run.processed, 0);
    assert_eq!(counting.call_count(), 0);
}

#[tokio::test]
async fn interrupted_run_resumes_where_it_stopped() {
    let media = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let db = scratch.path().join("ledger.db");
    for i in 0..4 {
        write_media(media.path(), &format!("item{}.mp4", i), 1024);
    }

    {
        let ledger = Arc::new(SqliteLedger::open(&db).unwrap());
        survey_directory(media.path(), &MockProber::new(600.0), &ledger)
            .await
            .unwrap();

        // First item completes normally.
        let claimed = ledger.claim_next().unwrap().unwrap();
        ledger
            .mark_completed(
                &claimed.key,
                &mediascribe::transcribe::CombinedTranscript::default(),
                &mediascribe::ledger::ResultSummary::default(),
            )
            .unwrap();
        // A second item dies mid-flight.
        ledger.claim_next().unwrap().unwrap();
    }

    let ledger = Arc::new(SqliteLedger::open(&db).unwrap());
    let run = orchestrator(
        ledger.clone(),
        MockTranscriptionService::new("whisper-1"),
        scratch.path(),
        ShutdownFlag::new(),
    )
    .run()
    .await
    .unwrap();

    // The interrupted item was recovered and the remaining three processed.
    assert_eq!(run.recovered, 1);
    assert_eq!(run.completed, 3);
    let counts = ledger.counts().unwrap();
    assert_eq!(counts.completed, 4);
    assert_eq!(counts.pending, 0);
}
