//! The engine facade used by every transport.
//!
//! [`GameEngine`] wires the client registry, matchmaker, session store and
//! round engine together, turns committed transitions into notifications,
//! and hands terminal sessions to the result recorder.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{Client, ClientRegistry};
use crate::error::EngineError;
use crate::games::hard_to_get::{
    Corpus, Dilemma, GameRules, Outcome, Resolution, Role, RoundEngine, RoundStarted,
};
use crate::matchmaker::{Assignment, Matchmaker};
use crate::notify::{GameEvent, Notification, Notifier};
use crate::random::RandomSource;
use crate::recorder::{GameResult, ResultRecorder};
use crate::session::{ClientId, Session, SessionId, SessionStatus, SessionStore, Turn};

/// Reply to an accepted Witness choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceReceipt {
    /// Always `"success"`.
    pub status: String,
    /// Round the choice belongs to.
    pub round: u8,
}

/// Reply to an accepted Detective elimination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminationReport {
    /// Whether the session is now completed.
    pub game_over: bool,
    /// Whether the Detective won; present only when the game is over.
    pub win: Option<bool>,
    /// Board after the elimination.
    pub remaining_words: Vec<String>,
    /// Whether the key word was among the eliminated words.
    pub key_word_eliminated: bool,
}

/// Public snapshot of a session. The key word is hidden until completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    /// Session ID.
    pub session_id: SessionId,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Witness, once assigned.
    pub witness_id: Option<ClientId>,
    /// Detective, once assigned.
    pub detective_id: Option<ClientId>,
    /// Remaining words.
    pub board: Vec<String>,
    /// Current round, 0 before activation.
    pub current_round: u8,
    /// Last permitted round.
    pub max_rounds: u8,
    /// The secret word, revealed once completed.
    pub key_word: Option<String>,
    /// Detective's result, once completed.
    pub outcome: Option<Outcome>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        let outcome = match session.turn() {
            Turn::Finished { outcome, .. } => Some(*outcome),
            _ => None,
        };
        Self {
            session_id: session.id().clone(),
            status: *session.status(),
            witness_id: session.witness_id().clone(),
            detective_id: session.detective_id().clone(),
            board: session.board().words().to_vec(),
            current_round: *session.current_round(),
            max_rounds: session.rules().max_rounds,
            key_word: outcome.and(session.key_word().clone()),
            outcome,
        }
    }
}

/// What one participant should do right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TurnView {
    /// The session has not started.
    Waiting,
    /// Caller is the Witness and must choose.
    Witness {
        /// Current round.
        round: u8,
        /// The secret word.
        key_word: String,
        /// Dilemma to answer.
        dilemma: Dilemma,
    },
    /// Caller is the Detective and must eliminate.
    Detective {
        /// Current round.
        round: u8,
        /// The dilemma the Witness answered.
        dilemma: Dilemma,
        /// The side the Witness chose.
        witness_choice: String,
    },
    /// The other participant is to move.
    Observe {
        /// Current round.
        round: u8,
    },
    /// The game is over.
    Finished {
        /// Whether the Detective won.
        win: bool,
        /// The secret word.
        key_word: String,
        /// The board at the end.
        final_board: Vec<String>,
    },
}

/// Coordinates every game hosted by one server.
pub struct GameEngine {
    store: SessionStore,
    registry: ClientRegistry,
    matchmaker: Matchmaker,
    rounds: RoundEngine,
    notifier: Arc<dyn Notifier>,
    recorder: Arc<dyn ResultRecorder>,
    rules: GameRules,
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("sessions", &self.store.len())
            .field("clients", &self.registry.len())
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl GameEngine {
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// [`EngineError::Corpus`] if the corpus cannot fill a board of
    /// `rules.board_size` words.
    #[instrument(skip(corpus, rng, notifier, recorder))]
    pub fn new(
        corpus: Corpus,
        rules: GameRules,
        rng: RandomSource,
        notifier: Arc<dyn Notifier>,
        recorder: Arc<dyn ResultRecorder>,
    ) -> Result<Self, EngineError> {
        corpus.ensure_board_size(rules.board_size)?;
        let corpus = Arc::new(corpus);
        info!(
            words = corpus.words().len(),
            dilemmas = corpus.dilemmas().len(),
            "Creating game engine"
        );
        Ok(Self {
            store: SessionStore::new(),
            registry: ClientRegistry::new(),
            matchmaker: Matchmaker::new(Arc::clone(&corpus), rng.clone(), rules),
            rounds: RoundEngine::new(corpus, rng),
            notifier,
            recorder,
            rules,
        })
    }

    /// Rules applied to new sessions.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Registers a client under a free-form model label.
    #[instrument(skip(self))]
    pub fn register(&self, model_name: String) -> Client {
        let client = self.registry.register(model_name);
        self.persist_client(&client);
        client
    }

    /// Looks up a registered client.
    #[instrument(skip(self))]
    pub fn client(&self, client_id: &str) -> Option<Client> {
        self.registry.get(client_id)
    }

    /// Places a client in a session. When this fills the second role,
    /// round 1 has started by the time this returns.
    ///
    /// # Errors
    ///
    /// See [`Matchmaker::assign`].
    #[instrument(skip(self))]
    pub fn join(
        &self,
        client_id: &str,
        preferred: Option<Role>,
    ) -> Result<Assignment, EngineError> {
        let assignment = self
            .matchmaker
            .assign(&self.store, &self.registry, client_id, preferred)
            .inspect_err(|e| warn!(error = %e, "Join rejected"))?;

        if let Some(client) = self.registry.get(client_id) {
            self.persist_client(&client);
        }

        if assignment.session_ready {
            let started = self
                .store
                .transact(&assignment.session_id, |s| self.rounds.start(s))?;
            self.announce_start(started);
        }
        self.persist_session(&assignment.session_id);

        Ok(assignment)
    }

    fn announce_start(&self, started: RoundStarted) {
        let RoundStarted {
            session_id,
            participants,
            witness_id,
            key_word,
            dilemma,
        } = started;
        self.notifier.notify(Notification::to_session(
            session_id.clone(),
            participants,
            GameEvent::SessionStarted {
                session_id: session_id.clone(),
            },
        ));
        self.notifier.notify(Notification::to_client(
            witness_id,
            GameEvent::WitnessTurn {
                session_id,
                key_word,
                dilemma,
                round: 1,
            },
        ));
    }

    /// Accepts the Witness's side of the current dilemma.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidSessionState`] for unknown sessions, the wrong
    ///   phase, or a caller who is not the Witness
    /// - [`EngineError::InvalidMove`] if `choice` was not offered
    #[instrument(skip(self))]
    pub fn submit_witness_choice(
        &self,
        session_id: &str,
        client_id: &str,
        choice: &str,
    ) -> Result<ChoiceReceipt, EngineError> {
        let accepted = self
            .store
            .transact(session_id, |s| self.rounds.witness_turn(s, client_id, choice))
            .inspect_err(|e| warn!(error = %e, "Witness choice rejected"))?;

        self.notifier.notify(Notification::to_client(
            accepted.detective_id,
            GameEvent::DetectiveTurn {
                session_id: session_id.to_string(),
                round: accepted.round,
                dilemma: accepted.dilemma,
                witness_choice: accepted.witness_choice,
            },
        ));
        self.persist_session(session_id);

        Ok(ChoiceReceipt {
            status: "success".to_string(),
            round: accepted.round,
        })
    }

    /// Applies the Detective's elimination and resolves the round.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidSessionState`] for unknown sessions, the wrong
    ///   phase, or a caller who is not the Detective
    /// - [`EngineError::InvalidMove`] for empty or off-board eliminations
    #[instrument(skip(self, words), fields(requested = words.len()))]
    pub fn submit_detective_elimination(
        &self,
        session_id: &str,
        client_id: &str,
        words: &[String],
    ) -> Result<EliminationReport, EngineError> {
        let applied = self
            .store
            .transact(session_id, |s| self.rounds.detective_turn(s, client_id, words))
            .inspect_err(|e| warn!(error = %e, "Elimination rejected"))?;

        let win = match applied.resolution {
            Resolution::NextRound {
                witness_id,
                round,
                dilemma,
                key_word,
            } => {
                self.notifier.notify(Notification::to_client(
                    witness_id,
                    GameEvent::WitnessTurn {
                        session_id: session_id.to_string(),
                        key_word,
                        dilemma,
                        round,
                    },
                ));
                self.persist_session(session_id);
                None
            }
            Resolution::Completed { outcome, key_word } => {
                self.finish(session_id, outcome, key_word, applied.remaining.clone());
                Some(outcome.is_win())
            }
        };

        Ok(EliminationReport {
            game_over: win.is_some(),
            win,
            remaining_words: applied.remaining,
            key_word_eliminated: applied.key_word_eliminated,
        })
    }

    /// Broadcasts the end of a session and records its result.
    fn finish(
        &self,
        session_id: &str,
        outcome: Outcome,
        key_word: String,
        final_board: Vec<String>,
    ) {
        let Some(session) = self.store.get(session_id) else {
            error!(session_id, "Completed session vanished");
            return;
        };

        self.notifier.notify(Notification::to_session(
            session_id,
            session.participants(),
            GameEvent::SessionEnded {
                session_id: session_id.to_string(),
                win: outcome.is_win(),
                key_word,
                final_board,
            },
        ));

        self.persist_session(session_id);

        let model = |id: &Option<ClientId>| {
            id.as_deref()
                .and_then(|id| self.registry.get(id))
                .map(|c| c.model_name().clone())
                .unwrap_or_default()
        };
        let result = GameResult::from_session(
            &session,
            model(session.witness_id()),
            model(session.detective_id()),
        );
        match result {
            Ok(result) => match self.recorder.record_result(&result) {
                Ok(()) => info!(session_id, ?outcome, "Result recorded"),
                Err(e) => error!(session_id, error = %e, "Failed to record result"),
            },
            Err(e) => error!(session_id, error = %e, "Could not build result"),
        }
    }

    /// Public snapshot of a session.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidSessionState`] if the session is unknown.
    #[instrument(skip(self))]
    pub fn session(&self, session_id: &str) -> Result<SessionView, EngineError> {
        self.store
            .get(session_id)
            .map(|s| SessionView::from(&s))
            .ok_or_else(|| EngineError::invalid_state(session_id, "unknown session"))
    }

    /// What `client_id` should do now in `session_id`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidSessionState`] if the session is unknown or the
    /// caller is not one of its participants.
    #[instrument(skip(self))]
    pub fn turn(&self, session_id: &str, client_id: &str) -> Result<TurnView, EngineError> {
        let session = self
            .store
            .get(session_id)
            .ok_or_else(|| EngineError::invalid_state(session_id, "unknown session"))?;
        let role = session.role_of(client_id).ok_or_else(|| {
            EngineError::invalid_state(
                session_id,
                format!("client '{}' is not a participant", client_id),
            )
        })?;
        let round = *session.current_round();

        let view = match (session.turn(), role) {
            (Turn::Waiting, _) => TurnView::Waiting,
            (Turn::Witness { dilemma }, Role::Witness) => TurnView::Witness {
                round,
                key_word: session.key_word().clone().unwrap_or_default(),
                dilemma: dilemma.clone(),
            },
            (
                Turn::Detective {
                    dilemma,
                    witness_choice,
                },
                Role::Detective,
            ) => TurnView::Detective {
                round,
                dilemma: dilemma.clone(),
                witness_choice: witness_choice.clone(),
            },
            (Turn::Finished { outcome, .. }, _) => TurnView::Finished {
                win: outcome.is_win(),
                key_word: session.key_word().clone().unwrap_or_default(),
                final_board: session.board().words().to_vec(),
            },
            _ => TurnView::Observe { round },
        };
        debug!(%role, ?view, "Turn view");
        Ok(view)
    }

    fn persist_client(&self, client: &Client) {
        if let Err(e) = self.recorder.record_client(client) {
            error!(client_id = %client.id(), error = %e, "Failed to persist client");
        }
    }

    /// Mirrors the live session under its lock, so an older snapshot can
    /// never be written after a newer one.
    fn persist_session(&self, session_id: &str) {
        let written = self
            .store
            .inspect(session_id, |session| self.recorder.record_session(session));
        if let Some(Err(e)) = written {
            error!(session_id, error = %e, "Failed to persist session");
        }
    }
}
