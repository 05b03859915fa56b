//! Command-line interface for mediascribe
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resumable batch transcription for oversized media archives
#[derive(Parser, Debug)]
#[command(
    name = "mediascribe",
    version,
    about = "Resumable batch transcription for oversized media archives"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ledger database path override
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-item detail, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a duration string into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`).
fn parse_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a directory for media files and enqueue them as pending
    Survey {
        /// Root directory to scan recursively
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Process the pending queue until drained or interrupted
    Run {
        /// Whisper model override (e.g., whisper-1)
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,

        /// Language code override (e.g., en, de)
        #[arg(long, value_name = "LANG")]
        language: Option<String>,

        /// Pause between items. Examples: 2, 30s, 1m
        #[arg(long, value_name = "DURATION", value_parser = parse_secs)]
        item_pacing: Option<u64>,
    },

    /// Show ledger counts, cost, and failed items
    Status,

    /// Move failed items back to pending for the next run
    RetryFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_survey_with_dir() {
        let cli = Cli::parse_from(["mediascribe", "survey", "/media/archive"]);
        match cli.command {
            Commands::Survey { dir } => assert_eq!(dir, PathBuf::from("/media/archive")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::parse_from([
            "mediascribe",
            "run",
            "--model",
            "whisper-large",
            "--item-pacing",
            "2s",
        ]);
        match cli.command {
            Commands::Run {
                model,
                language,
                item_pacing,
            } => {
                assert_eq!(model.as_deref(), Some("whisper-large"));
                assert!(language.is_none());
                assert_eq!(item_pacing, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = Cli::parse_from(["mediascribe", "status", "--db", "/tmp/x.db", "-vv"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn duration_parser_accepts_bare_and_unit_forms() {
        assert_eq!(parse_secs("90"), Ok(90));
        assert_eq!(parse_secs("2m"), Ok(120));
        assert_eq!(parse_secs("1h30m"), Ok(5400));
        assert!(parse_secs("soon").is_err());
    }
}
