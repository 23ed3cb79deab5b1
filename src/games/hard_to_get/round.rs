//! Round engine: the per-round state machine.
//!
//! ```text
//! Ready ─start─▶ WitnessTurn(1) ─choice─▶ DetectiveTurn(1) ─eliminate─▶ WitnessTurn(2)
//!                                                       └─────────────▶ Completed
//! ```
//!
//! Every method here runs inside the session store's critical section and
//! mutates only the working copy it is handed, so any error leaves the stored
//! session untouched.

use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::rules::{self, Verdict};
use super::{Corpus, Dilemma, Elimination, Outcome, Role};
use crate::error::EngineError;
use crate::random::RandomSource;
use crate::session::{ClientId, Session, SessionId, SessionStatus, Turn};

/// Round 1 has opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundStarted {
    /// Session that started.
    pub session_id: SessionId,
    /// Witness and Detective.
    pub participants: Vec<ClientId>,
    /// Witness client.
    pub witness_id: ClientId,
    /// The secret word.
    pub key_word: String,
    /// Round 1's dilemma.
    pub dilemma: Dilemma,
}

/// The Witness's choice was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceAccepted {
    /// Detective to notify.
    pub detective_id: ClientId,
    /// Current round.
    pub round: u8,
    /// The dilemma the Witness answered.
    pub dilemma: Dilemma,
    /// The side chosen.
    pub witness_choice: String,
}

/// What an accepted elimination led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A new round opened for the Witness.
    NextRound {
        /// Witness to notify.
        witness_id: ClientId,
        /// The new round number.
        round: u8,
        /// The new round's dilemma.
        dilemma: Dilemma,
        /// The secret word.
        key_word: String,
    },
    /// The session completed.
    Completed {
        /// Result from the Detective's perspective.
        outcome: Outcome,
        /// The secret word.
        key_word: String,
    },
}

/// Result of an accepted Detective turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EliminationApplied {
    /// Words actually removed, in board order.
    pub removed: Vec<String>,
    /// Board after removal.
    pub remaining: Vec<String>,
    /// Whether the key word was removed.
    pub key_word_eliminated: bool,
    /// Where play goes next.
    pub resolution: Resolution,
}

/// Drives sessions through their rounds.
#[derive(Debug, Clone)]
pub struct RoundEngine {
    corpus: Arc<Corpus>,
    rng: RandomSource,
}

impl RoundEngine {
    /// Creates a round engine drawing from `corpus` with `rng`.
    pub fn new(corpus: Arc<Corpus>, rng: RandomSource) -> Self {
        Self { corpus, rng }
    }

    fn draw_dilemma(&self) -> Dilemma {
        self.rng.with(|rng| self.corpus.draw_dilemma(rng))
    }

    /// `Ready → WitnessTurn(1)`: picks the key word uniformly from the board
    /// and draws round 1's dilemma.
    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    pub fn start(&self, session: &mut Session) -> Result<RoundStarted, EngineError> {
        if *session.status() != SessionStatus::Ready {
            return Err(EngineError::invalid_state(
                session.id().clone(),
                format!("cannot start a {} session", session.status()),
            ));
        }
        let key_word = self
            .rng
            .with(|rng| session.board().words().choose(rng).cloned())
            .ok_or_else(|| EngineError::invalid_state(session.id().clone(), "board is empty"))?;
        let dilemma = self.draw_dilemma();

        session.activate(key_word.clone(), dilemma.clone())?;

        let witness_id = session
            .witness_id()
            .clone()
            .ok_or_else(|| EngineError::invalid_state(session.id().clone(), "no Witness"))?;
        info!(%dilemma, "Round 1 started");
        Ok(RoundStarted {
            session_id: session.id().clone(),
            participants: session.participants(),
            witness_id,
            key_word,
            dilemma,
        })
    }

    /// `WitnessTurn(n) → DetectiveTurn(n)`.
    #[instrument(
        skip(self, session),
        fields(session_id = %session.id(), round = session.current_round())
    )]
    pub fn witness_turn(
        &self,
        session: &mut Session,
        client_id: &str,
        choice: &str,
    ) -> Result<ChoiceAccepted, EngineError> {
        require_role(session, client_id, Role::Witness)?;
        let dilemma = session.record_witness_choice(choice)?;
        let detective_id = session
            .detective_id()
            .clone()
            .ok_or_else(|| EngineError::invalid_state(session.id().clone(), "no Detective"))?;
        info!(choice, "Witness choice accepted");
        Ok(ChoiceAccepted {
            detective_id,
            round: *session.current_round(),
            dilemma,
            witness_choice: choice.to_string(),
        })
    }

    /// `DetectiveTurn(n) → WitnessTurn(n+1) | Completed`.
    #[instrument(
        skip(self, session, words),
        fields(
            session_id = %session.id(),
            round = session.current_round(),
            requested = words.len()
        )
    )]
    pub fn detective_turn(
        &self,
        session: &mut Session,
        client_id: &str,
        words: &[String],
    ) -> Result<EliminationApplied, EngineError> {
        require_role(session, client_id, Role::Detective)?;
        if !matches!(session.turn(), Turn::Detective { .. }) {
            return Err(EngineError::invalid_state(
                session.id().clone(),
                "not the Detective's turn",
            ));
        }

        let elimination = Elimination::validate(session.board(), words).inspect_err(|e| {
            warn!(error = %e, "Elimination rejected");
        })?;
        let key_word_eliminated = session.eliminate(&elimination)?;
        let key_word = session
            .key_word()
            .clone()
            .ok_or_else(|| EngineError::invalid_state(session.id().clone(), "no key word"))?;

        let round = *session.current_round();
        let verdict = rules::judge(
            session.board(),
            &key_word,
            key_word_eliminated,
            round,
            session.rules(),
        );

        let resolution = match verdict {
            Verdict::Finished(outcome) => {
                session.complete(outcome, key_word_eliminated)?;
                Resolution::Completed { outcome, key_word }
            }
            Verdict::Continue => {
                let dilemma = self.draw_dilemma();
                let round = session.advance_round(dilemma.clone())?;
                let witness_id = session
                    .witness_id()
                    .clone()
                    .ok_or_else(|| EngineError::invalid_state(session.id().clone(), "no Witness"))?;
                Resolution::NextRound {
                    witness_id,
                    round,
                    dilemma,
                    key_word,
                }
            }
        };

        info!(
            removed = elimination.words().len(),
            remaining = session.board().len(),
            key_word_eliminated,
            ?resolution,
            "Elimination applied"
        );
        Ok(EliminationApplied {
            removed: elimination.words().to_vec(),
            remaining: session.board().words().to_vec(),
            key_word_eliminated,
            resolution,
        })
    }
}

fn require_role(session: &Session, client_id: &str, role: Role) -> Result<(), EngineError> {
    if session.role_of(client_id) == Some(role) {
        return Ok(());
    }
    warn!(client_id, %role, "Submission from wrong participant");
    Err(EngineError::invalid_state(
        session.id().clone(),
        format!("client '{}' is not this session's {}", client_id, role),
    ))
}
