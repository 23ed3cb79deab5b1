//! Result recording.
//!
//! The engine hands every terminal session to a [`ResultRecorder`] exactly
//! once. Recorders may also mirror clients and session snapshots.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::client::Client;
use crate::db::{DbError, GameRepository, NewClientRow, NewResultRow, NewSessionRow};
use crate::error::EngineError;
use crate::games::hard_to_get::Outcome;
use crate::session::{ClientId, Session, SessionId, Turn, lock};

/// Outcome of a finished session, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// The finished session.
    pub session_id: SessionId,
    /// Witness client.
    pub witness_id: ClientId,
    /// Witness model label.
    pub witness_model: String,
    /// Detective client.
    pub detective_id: ClientId,
    /// Detective model label.
    pub detective_model: String,
    /// Result from the Detective's perspective.
    pub outcome: Outcome,
    /// The secret word.
    pub key_word: String,
    /// Board at termination.
    pub final_board: Vec<String>,
    /// Rounds played, including the last.
    pub rounds_played: u8,
}

impl GameResult {
    /// Builds the result of a completed session.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidSessionState`] if the session has not completed.
    #[instrument(skip(session), fields(session_id = %session.id()))]
    pub fn from_session(
        session: &Session,
        witness_model: String,
        detective_model: String,
    ) -> Result<Self, EngineError> {
        let Turn::Finished { outcome, .. } = session.turn() else {
            return Err(EngineError::invalid_state(
                session.id().clone(),
                "session has not finished",
            ));
        };
        let missing =
            |what: &str| EngineError::invalid_state(session.id().clone(), format!("no {}", what));
        Ok(Self {
            session_id: session.id().clone(),
            witness_id: session.witness_id().clone().ok_or_else(|| missing("Witness"))?,
            witness_model,
            detective_id: session.detective_id().clone().ok_or_else(|| missing("Detective"))?,
            detective_model,
            outcome: *outcome,
            key_word: session.key_word().clone().ok_or_else(|| missing("key word"))?,
            final_board: session.board().words().to_vec(),
            rounds_played: *session.current_round(),
        })
    }
}

/// Sink for clients, session snapshots and terminal results.
///
/// Failures are reported to the caller, which logs them; they never roll
/// back a committed engine transition.
pub trait ResultRecorder: Send + Sync {
    /// Mirrors a client after registration or assignment.
    fn record_client(&self, _client: &Client) -> Result<(), DbError> {
        Ok(())
    }

    /// Mirrors a session snapshot.
    fn record_session(&self, _session: &Session) -> Result<(), DbError> {
        Ok(())
    }

    /// Stores the result of a completed session.
    fn record_result(&self, result: &GameResult) -> Result<(), DbError>;
}

/// Keeps results in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    results: Mutex<Vec<GameResult>>,
}

impl MemoryRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All results recorded so far, oldest first.
    pub fn results(&self) -> Vec<GameResult> {
        lock(&self.results).clone()
    }
}

impl ResultRecorder for MemoryRecorder {
    #[instrument(skip(self, result), fields(session_id = %result.session_id))]
    fn record_result(&self, result: &GameResult) -> Result<(), DbError> {
        let mut results = lock(&self.results);
        if results.iter().any(|r| r.session_id == result.session_id) {
            return Err(DbError::new(format!(
                "Result for session '{}' already recorded",
                result.session_id
            )));
        }
        results.push(result.clone());
        debug!(count = results.len(), "Result kept in memory");
        Ok(())
    }
}

/// Persists everything through a [`GameRepository`].
#[derive(Debug, Clone)]
pub struct DbRecorder {
    repository: GameRepository,
}

impl DbRecorder {
    /// Creates a recorder backed by `repository`.
    #[instrument(skip(repository))]
    pub fn new(repository: GameRepository) -> Self {
        info!("Creating DbRecorder");
        Self { repository }
    }
}

impl ResultRecorder for DbRecorder {
    #[instrument(skip(self, client), fields(client_id = %client.id()))]
    fn record_client(&self, client: &Client) -> Result<(), DbError> {
        self.repository.upsert_client(NewClientRow::from(client))
    }

    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    fn record_session(&self, session: &Session) -> Result<(), DbError> {
        self.repository.save_session(NewSessionRow::from_session(session)?)
    }

    #[instrument(skip(self, result), fields(session_id = %result.session_id))]
    fn record_result(&self, result: &GameResult) -> Result<(), DbError> {
        let row = self.repository.record_result(NewResultRow::from_result(result)?)?;
        info!(outcome = %row.outcome(), "Result persisted");
        Ok(())
    }
}
