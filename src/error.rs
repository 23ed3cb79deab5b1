//! Engine error taxonomy.
//!
//! Every variant is a local rejection: the operation that produced it changed
//! nothing, and the engine keeps running.

use crate::games::hard_to_get::{CorpusError, MoveError, Role};
use tracing::instrument;

/// Rejection returned by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From)]
pub enum EngineError {
    /// Unknown client, or a client that is already in a session.
    #[display("Invalid client '{}': {}", client_id, reason)]
    InvalidClient {
        /// The client named by the caller.
        client_id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Unknown session, wrong phase, or a caller who does not hold the
    /// role the phase expects.
    #[display("Invalid state for session '{}': {}", session_id, reason)]
    InvalidSessionState {
        /// The session named by the caller.
        session_id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The submission itself is not a legal move.
    #[display("Invalid move: {}", _0)]
    #[from]
    InvalidMove(MoveError),

    /// A role slot was taken by a concurrent join; retry the join.
    #[display("{} slot of session '{}' is already filled, retry join", role, session_id)]
    ConcurrencyConflict {
        /// Session whose slot was taken.
        session_id: String,
        /// The contested role.
        role: Role,
    },

    /// The corpus could not supply a board.
    #[display("Corpus error: {}", _0)]
    #[from]
    Corpus(CorpusError),
}

impl std::error::Error for EngineError {}

impl EngineError {
    /// Builds an [`EngineError::InvalidClient`].
    #[instrument(skip_all)]
    pub fn invalid_client(client_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidClient {
            client_id: client_id.into(),
            reason: reason.into(),
        }
    }

    /// Builds an [`EngineError::InvalidSessionState`].
    #[instrument(skip_all)]
    pub fn invalid_state(session_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSessionState {
            session_id: session_id.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidSessionState { .. } => "invalid_session_state",
            Self::InvalidMove(_) => "invalid_move",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::Corpus(_) => "corpus",
        }
    }
}
