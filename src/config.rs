//! Server configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::db::GameRepository;
use crate::games::hard_to_get::{BOARD_SIZE, Corpus, GameRules, MAX_ROUNDS};
use crate::random::RandomSource;
use crate::recorder::{DbRecorder, MemoryRecorder, ResultRecorder};

/// Configuration for a game server, loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// SQLite database path. Results stay in memory when unset.
    db_path: Option<String>,

    /// Word list, one word per line.
    words_path: Option<PathBuf>,

    /// Dilemma list, `left,right` per line.
    dilemmas_path: Option<PathBuf>,

    /// Words on a fresh board.
    board_size: usize,

    /// Last permitted round.
    max_rounds: u8,

    /// Fixed RNG seed for reproducible games.
    seed: Option<u64>,

    /// Events buffered per notification subscriber.
    event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            words_path: None,
            dilemmas_path: None,
            board_size: BOARD_SIZE,
            max_rounds: MAX_ROUNDS,
            seed: None,
            event_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Loads and validates configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        info!(
            board_size = config.board_size,
            max_rounds = config.max_rounds,
            "Config loaded successfully"
        );
        Ok(config)
    }

    /// Overrides the database path.
    pub fn with_db_path(mut self, db_path: Option<String>) -> Self {
        if db_path.is_some() {
            self.db_path = db_path;
        }
        self
    }

    /// Checks value ranges.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_size < 2 {
            return Err(ConfigError::new(format!(
                "board_size must be at least 2, got {}",
                self.board_size
            )));
        }
        if self.max_rounds < 1 {
            return Err(ConfigError::new("max_rounds must be at least 1".to_string()));
        }
        if self.event_buffer < 1 {
            return Err(ConfigError::new("event_buffer must be at least 1".to_string()));
        }
        if self.words_path.is_some() != self.dilemmas_path.is_some() {
            return Err(ConfigError::new(
                "words_path and dilemmas_path must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Game rules for new sessions.
    pub fn rules(&self) -> GameRules {
        GameRules {
            board_size: self.board_size,
            max_rounds: self.max_rounds,
        }
    }

    /// The seeded or entropy-backed random source.
    pub fn random_source(&self) -> RandomSource {
        match self.seed {
            Some(seed) => RandomSource::seeded(seed),
            None => RandomSource::from_entropy(),
        }
    }

    /// Loads the configured corpus, or the built-in one.
    #[instrument(skip(self))]
    pub fn corpus(&self) -> Result<Corpus, ConfigError> {
        match (&self.words_path, &self.dilemmas_path) {
            (Some(words), Some(dilemmas)) => Corpus::from_files(words, dilemmas)
                .map_err(|e| ConfigError::new(format!("Failed to load corpus: {}", e))),
            _ => Ok(Corpus::builtin()),
        }
    }

    /// Builds the result recorder: SQLite when `db_path` is set, memory
    /// otherwise. Migrations run before the recorder is returned.
    #[instrument(skip(self))]
    pub fn recorder(&self) -> Result<Arc<dyn ResultRecorder>, ConfigError> {
        let Some(db_path) = &self.db_path else {
            info!("No database configured, keeping results in memory");
            return Ok(Arc::new(MemoryRecorder::new()));
        };
        let repository = GameRepository::new(db_path.clone())
            .map_err(|e| ConfigError::new(e.to_string()))?;
        repository
            .run_migrations()
            .map_err(|e| ConfigError::new(e.to_string()))?;
        Ok(Arc::new(DbRecorder::new(repository)))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.rules(), GameRules::default());
        assert_eq!(*config.event_buffer(), 256);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = ServerConfig::from_toml("board_size = 8\nmax_rounds = 3\nseed = 7\n").unwrap();
        assert_eq!(*config.board_size(), 8);
        assert_eq!(*config.max_rounds(), 3);
        assert_eq!(*config.seed(), Some(7));
        assert!(config.db_path().is_none());
    }

    #[test]
    fn test_validation_rejects_tiny_board() {
        let err = ServerConfig::from_toml("board_size = 1").unwrap_err();
        assert!(err.message.contains("board_size"));
    }

    #[test]
    fn test_validation_rejects_zero_rounds() {
        assert!(ServerConfig::from_toml("max_rounds = 0").is_err());
    }

    #[test]
    fn test_corpus_paths_must_pair() {
        assert!(ServerConfig::from_toml("words_path = \"w.txt\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "event_buffer = 16\n").unwrap();
        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(*config.event_buffer(), 16);
    }

    #[test]
    fn test_without_db_path_records_in_memory() {
        assert!(ServerConfig::default().recorder().is_ok());
        assert_eq!(ServerConfig::default().corpus().unwrap().dilemmas().len(), 27);
    }
}
