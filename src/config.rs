use crate::defaults;
use crate::error::{MediascribeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub chunking: ChunkingConfig,
    pub transcription: TranscriptionConfig,
    pub batch: BatchConfig,
}

/// Ledger and scratch-space locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Ledger database path; defaults to the platform data directory.
    pub db_path: Option<PathBuf>,
    /// Directory for temporary chunk artifacts; defaults to the system
    /// temp directory.
    pub work_dir: Option<PathBuf>,
}

/// Chunk planning and extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub size_ceiling_mb: u64,
    pub safety_margin: f64,
    pub min_chunk_seconds: u32,
    pub extraction_timeout_seconds: u64,
    pub extraction_attempts: u32,
}

/// Transcription service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub api_base: String,
    /// API key; the OPENAI_API_KEY environment variable takes precedence.
    pub api_key: Option<String>,
    pub model: String,
    pub language: String,
    pub request_timeout_seconds: u64,
    pub attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub chunk_pacing_ms: u64,
}

/// Batch loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    pub item_pacing_ms: u64,
    pub report_every_items: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            work_dir: None,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size_ceiling_mb: defaults::SIZE_CEILING_BYTES / (1024 * 1024),
            safety_margin: defaults::SAFETY_MARGIN,
            min_chunk_seconds: defaults::MIN_CHUNK_SECONDS,
            extraction_timeout_seconds: defaults::EXTRACTION_TIMEOUT_SECONDS,
            extraction_attempts: defaults::EXTRACTION_ATTEMPTS,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: defaults::DEFAULT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            attempts: defaults::TRANSCRIPTION_ATTEMPTS,
            backoff_base_ms: defaults::BACKOFF_BASE_MS,
            backoff_cap_ms: defaults::BACKOFF_CAP_MS,
            chunk_pacing_ms: defaults::CHUNK_PACING_MS,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            item_pacing_ms: defaults::ITEM_PACING_MS,
            report_every_items: defaults::REPORT_EVERY_ITEMS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MediascribeError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                MediascribeError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, or return defaults if the file is missing.
    ///
    /// Invalid TOML is still an error; only a missing file falls back.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(MediascribeError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - MEDIASCRIBE_MODEL → transcription.model
    /// - MEDIASCRIBE_LANGUAGE → transcription.language
    /// - MEDIASCRIBE_API_BASE → transcription.api_base
    /// - MEDIASCRIBE_DB → storage.db_path
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("MEDIASCRIBE_MODEL")
            && !model.is_empty()
        {
            self.transcription.model = model;
        }

        if let Ok(language) = std::env::var("MEDIASCRIBE_LANGUAGE")
            && !language.is_empty()
        {
            self.transcription.language = language;
        }

        if let Ok(api_base) = std::env::var("MEDIASCRIBE_API_BASE")
            && !api_base.is_empty()
        {
            self.transcription.api_base = api_base;
        }

        if let Ok(db) = std::env::var("MEDIASCRIBE_DB")
            && !db.is_empty()
        {
            self.storage.db_path = Some(PathBuf::from(db));
        }

        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.size_ceiling_mb == 0 {
            return Err(MediascribeError::ConfigInvalidValue {
                key: "chunking.size_ceiling_mb".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if !(self.chunking.safety_margin > 0.0 && self.chunking.safety_margin <= 1.0) {
            return Err(MediascribeError::ConfigInvalidValue {
                key: "chunking.safety_margin".to_string(),
                message: "must be in (0, 1]".to_string(),
            });
        }
        if self.chunking.min_chunk_seconds < defaults::CHUNK_GRANULARITY_SECONDS {
            return Err(MediascribeError::ConfigInvalidValue {
                key: "chunking.min_chunk_seconds".to_string(),
                message: "must be at least one minute".to_string(),
            });
        }
        if self.chunking.extraction_attempts == 0 || self.transcription.attempts == 0 {
            return Err(MediascribeError::ConfigInvalidValue {
                key: "attempts".to_string(),
                message: "retry attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The API key, from the environment or the config file.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var("OPENAI_API_KEY")
            && !key.is_empty()
        {
            return Ok(key);
        }
        self.transcription
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| MediascribeError::ConfigInvalidValue {
                key: "transcription.api_key".to_string(),
                message: "set OPENAI_API_KEY or transcription.api_key".to_string(),
            })
    }

    /// Ledger database path, configured or defaulted to the data directory.
    pub fn db_path(&self) -> PathBuf {
        match &self.storage.db_path {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .expect("Could not determine data directory")
                .join("mediascribe")
                .join(defaults::DEFAULT_DB_FILENAME),
        }
    }

    /// Scratch directory for chunk artifacts.
    pub fn work_dir(&self) -> PathBuf {
        match &self.storage.work_dir {
            Some(path) => path.clone(),
            None => std::env::temp_dir(),
        }
    }

    /// Size ceiling in bytes.
    pub fn size_ceiling_bytes(&self) -> u64 {
        self.chunking.size_ceiling_mb * 1024 * 1024
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/mediascribe/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("mediascribe")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    #[test]
    fn defaults_pass_validation() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.chunking.size_ceiling_mb, 24);
        assert_eq!(config.size_ceiling_bytes(), 24 * 1024 * 1024);
        assert_eq!(config.chunking.safety_margin, 0.95);
        assert_eq!(config.chunking.min_chunk_seconds, 300);
        assert_eq!(config.transcription.model, "whisper-1");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [chunking]
            size_ceiling_mb = 20

            [transcription]
            model = "whisper-large"
            "#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.chunking.size_ceiling_mb, 20);
        assert_eq!(config.transcription.model, "whisper-large");
        // Untouched fields keep defaults.
        assert_eq!(config.chunking.safety_margin, 0.95);
        assert_eq!(config.batch.report_every_items, 5);
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = Config::load(Path::new("/nonexistent/config.toml"));
        assert!(matches!(
            result,
            Err(MediascribeError::ConfigFileNotFound { .. })
        ));
        let fallback = Config::load_or_default(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(fallback, Config::default());
    }

    #[test]
    fn invalid_toml_is_an_error_even_with_fallback() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chunking = not valid toml").unwrap();
        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn out_of_range_margin_is_rejected() {
        let mut config = Config::default();
        config.chunking.safety_margin = 1.5;
        assert!(matches!(
            config.validate(),
            Err(MediascribeError::ConfigInvalidValue { .. })
        ));
        config.chunking.safety_margin = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn sub_minute_chunk_floor_is_rejected() {
        let mut config = Config::default();
        config.chunking.min_chunk_seconds = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_env("MEDIASCRIBE_MODEL", "whisper-large-v3");
        set_env("MEDIASCRIBE_LANGUAGE", "de");
        set_env("MEDIASCRIBE_DB", "/tmp/other.db");

        let config = Config::default().with_env_overrides();
        assert_eq!(config.transcription.model, "whisper-large-v3");
        assert_eq!(config.transcription.language, "de");
        assert_eq!(config.storage.db_path.as_deref(), Some(Path::new("/tmp/other.db")));

        remove_env("MEDIASCRIBE_MODEL");
        remove_env("MEDIASCRIBE_LANGUAGE");
        remove_env("MEDIASCRIBE_DB");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_env("MEDIASCRIBE_MODEL", "");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.transcription.model, "whisper-1");
        remove_env("MEDIASCRIBE_MODEL");
    }

    #[test]
    fn api_key_prefers_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut config = Config::default();
        config.transcription.api_key = Some("file-key".to_string());

        set_env("OPENAI_API_KEY", "env-key");
        assert_eq!(config.resolve_api_key().unwrap(), "env-key");

        remove_env("OPENAI_API_KEY");
        assert_eq!(config.resolve_api_key().unwrap(), "file-key");

        config.transcription.api_key = None;
        assert!(config.resolve_api_key().is_err());
    }
}
