use anyhow::Result;
use clap::Parser;
use mediascribe::batch::{BatchOrchestrator, RunOutcome, ShutdownFlag};
use mediascribe::cli::{Cli, Commands};
use mediascribe::config::Config;
use mediascribe::extract::ffmpeg::FfmpegExtractor;
use mediascribe::extract::probe::FfprobeProber;
use mediascribe::ledger::SqliteLedger;
use mediascribe::survey::survey_directory;
use mediascribe::transcribe::merger::TranscriptionMerger;
use mediascribe::transcribe::whisper_api::WhisperApiClient;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mediascribe::logging::init(cli.quiet, cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.storage.db_path = Some(db);
    }

    match cli.command {
        Commands::Survey { dir } => run_survey(&config, &dir).await,
        Commands::Run {
            model,
            language,
            item_pacing,
        } => run_batch(config, model, language, item_pacing).await,
        Commands::Status => show_status(&config),
        Commands::RetryFailed => retry_failed(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    Ok(config.with_env_overrides())
}

async fn run_survey(config: &Config, dir: &Path) -> Result<()> {
    anyhow::ensure!(dir.is_dir(), "{} is not a directory", dir.display());

    let ledger = SqliteLedger::open(&config.db_path())?;
    let prober = FfprobeProber::new();
    let report = survey_directory(dir, &prober, &ledger).await?;

    println!(
        "Surveyed {} media file(s): {} enqueued, {} already tracked, {} probe failure(s)",
        report.discovered, report.enqueued, report.already_tracked, report.probe_failures
    );
    Ok(())
}

async fn run_batch(
    config: Config,
    model: Option<String>,
    language: Option<String>,
    item_pacing_secs: Option<u64>,
) -> Result<()> {
    let model = model.unwrap_or_else(|| config.transcription.model.clone());
    let language = language.unwrap_or_else(|| config.transcription.language.clone());
    let api_key = config.resolve_api_key()?;

    let service = WhisperApiClient::new(
        &config.transcription.api_base,
        &api_key,
        &model,
        Duration::from_secs(config.transcription.request_timeout_seconds),
    )?;
    let extractor = FfmpegExtractor::new(config.size_ceiling_bytes())
        .with_timeout(Duration::from_secs(config.chunking.extraction_timeout_seconds));

    let work_dir = config.work_dir();
    std::fs::create_dir_all(&work_dir)?;

    let merger = TranscriptionMerger::new(Arc::new(extractor), Arc::new(service), work_dir)
        .with_language(&language)
        .with_chunk_pacing(Duration::from_millis(config.transcription.chunk_pacing_ms))
        .with_extraction_attempts(config.chunking.extraction_attempts)
        .with_transcription_attempts(config.transcription.attempts)
        .with_backoff(
            Duration::from_millis(config.transcription.backoff_base_ms),
            Duration::from_millis(config.transcription.backoff_cap_ms),
        );

    let ledger = Arc::new(SqliteLedger::open(&config.db_path())?);
    let shutdown = ShutdownFlag::new();
    shutdown.listen_for_signals();

    let item_pacing = item_pacing_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_millis(config.batch.item_pacing_ms));

    let orchestrator = BatchOrchestrator::new(ledger.clone(), merger, shutdown)
        .with_size_ceiling(config.size_ceiling_bytes())
        .with_safety_margin(config.chunking.safety_margin)
        .with_min_chunk_seconds(config.chunking.min_chunk_seconds)
        .with_item_pacing(item_pacing)
        .with_report_every(config.batch.report_every_items);

    let report = orchestrator.run().await?;
    match report.outcome {
        RunOutcome::Drained => println!(
            "Queue drained: {} completed, {} failed (total cost ${:.2})",
            report.completed,
            report.failed,
            ledger.total_cost()?
        ),
        RunOutcome::ShutdownComplete => println!(
            "Stopped at an item boundary after {} item(s); rerun to resume",
            report.processed
        ),
    }

    if report.failed > 0 {
        println!("Re-queue failed items with: mediascribe retry-failed");
    }
    Ok(())
}

fn show_status(config: &Config) -> Result<()> {
    let ledger = SqliteLedger::open(&config.db_path())?;
    let counts = ledger.counts()?;

    println!("Ledger: {}", ledger.db_path().display());
    println!(
        "  pending: {}  in progress: {}  completed: {}  failed: {}",
        counts.pending, counts.in_progress, counts.completed, counts.failed
    );
    println!("  accumulated cost: ${:.2}", ledger.total_cost()?);

    let failed = ledger.failed_entries()?;
    if !failed.is_empty() {
        println!("Failed items:");
        for entry in failed {
            println!(
                "  {} (attempts: {}): {}",
                entry.key,
                entry.attempts,
                entry.last_error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(())
}

fn retry_failed(config: &Config) -> Result<()> {
    let ledger = SqliteLedger::open(&config.db_path())?;
    let requeued = ledger.retry_failed()?;
    if requeued == 0 {
        println!("No failed items to re-queue");
    } else {
        println!("Re-queued {} failed item(s) as pending", requeued);
    }
    Ok(())
}
