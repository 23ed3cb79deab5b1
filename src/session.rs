//! Session records and the session store.
//!
//! The store is the only writer of session state. Every mutation runs inside
//! a per-session critical section against a working copy that is committed
//! only when the whole operation succeeds.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::error::EngineError;
use crate::games::hard_to_get::invariants;
use crate::games::hard_to_get::{
    Board, Dilemma, Elimination, GameRules, MoveError, Outcome, Role,
};

/// Unique identifier for a session.
pub type SessionId = String;

/// Unique identifier for a client.
pub type ClientId = String;

/// Locks a mutex, recovering the data if another holder panicked.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session lifecycle. Strictly forward.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for a second client.
    Pending,
    /// Both roles filled, round 1 not yet started.
    Ready,
    /// Rounds in play.
    Active,
    /// Game over.
    Completed,
}

/// Whose move the session is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Turn {
    /// Not started.
    Waiting,
    /// The Witness must pick a side of `dilemma`.
    Witness {
        /// This round's dilemma.
        dilemma: Dilemma,
    },
    /// The Detective must eliminate words.
    Detective {
        /// This round's dilemma, as answered by the Witness.
        dilemma: Dilemma,
        /// The side the Witness chose.
        witness_choice: String,
    },
    /// The game is over.
    Finished {
        /// Result from the Detective's perspective.
        outcome: Outcome,
        /// Whether the Detective eliminated the key word.
        key_word_eliminated: bool,
    },
}

/// One game between a Witness and a Detective.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Session {
    /// Session ID.
    id: SessionId,
    /// Client holding the Witness role.
    witness_id: Option<ClientId>,
    /// Client holding the Detective role.
    detective_id: Option<ClientId>,
    /// Lifecycle status.
    status: SessionStatus,
    /// Remaining candidate words.
    board: Board,
    /// Secret word, chosen on activation.
    key_word: Option<String>,
    /// 0 until active, then 1..=max_rounds.
    current_round: u8,
    /// Whose move it is.
    turn: Turn,
    /// Parameters fixed at creation.
    rules: GameRules,
}

impl Session {
    /// Creates a pending session with no participants.
    #[instrument(skip(board), fields(board = board.len()))]
    pub fn new(id: SessionId, board: Board, rules: GameRules) -> Self {
        info!(session_id = %id, "Creating new session");
        Self {
            id,
            witness_id: None,
            detective_id: None,
            status: SessionStatus::Pending,
            board,
            key_word: None,
            current_round: 0,
            turn: Turn::Waiting,
            rules,
        }
    }

    /// Client holding `role`, if any.
    pub fn occupant(&self, role: Role) -> Option<&ClientId> {
        match role {
            Role::Witness => self.witness_id.as_ref(),
            Role::Detective => self.detective_id.as_ref(),
        }
    }

    /// Role held by `client_id` in this session.
    pub fn role_of(&self, client_id: &str) -> Option<Role> {
        if self.witness_id.as_deref() == Some(client_id) {
            Some(Role::Witness)
        } else if self.detective_id.as_deref() == Some(client_id) {
            Some(Role::Detective)
        } else {
            None
        }
    }

    /// The role nobody holds yet, when exactly one is open.
    pub fn open_role(&self) -> Option<Role> {
        match (&self.witness_id, &self.detective_id) {
            (None, Some(_)) => Some(Role::Witness),
            (Some(_), None) => Some(Role::Detective),
            _ => None,
        }
    }

    /// Both participants, Witness first.
    pub fn participants(&self) -> Vec<ClientId> {
        self.witness_id
            .iter()
            .chain(self.detective_id.iter())
            .cloned()
            .collect()
    }

    /// True once the game is over.
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    fn invalid(&self, reason: impl Into<String>) -> EngineError {
        EngineError::invalid_state(self.id.clone(), reason)
    }

    /// Places `client_id` in `role`; the session becomes `Ready` once both
    /// roles are filled.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn fill_role(
        &mut self,
        role: Role,
        client_id: &str,
    ) -> Result<SessionStatus, EngineError> {
        if self.status != SessionStatus::Pending {
            return Err(self.invalid(format!("cannot join a {} session", self.status)));
        }
        if self.occupant(role).is_some() {
            warn!(%role, client_id, "Role already filled");
            return Err(EngineError::ConcurrencyConflict {
                session_id: self.id.clone(),
                role,
            });
        }
        if self.role_of(client_id).is_some() {
            return Err(EngineError::invalid_client(client_id, "already holds the other role"));
        }

        let slot = match role {
            Role::Witness => &mut self.witness_id,
            Role::Detective => &mut self.detective_id,
        };
        *slot = Some(client_id.to_string());
        info!(%role, client_id, "Role filled");

        if self.witness_id.is_some() && self.detective_id.is_some() {
            self.status = SessionStatus::Ready;
            info!("Both roles filled, session ready");
        }
        Ok(self.status)
    }

    /// `Ready → Active`: fixes the key word and opens round 1.
    #[instrument(skip(self, dilemma), fields(session_id = %self.id))]
    pub(crate) fn activate(
        &mut self,
        key_word: String,
        dilemma: Dilemma,
    ) -> Result<(), EngineError> {
        if self.status != SessionStatus::Ready {
            return Err(self.invalid(format!("cannot start a {} session", self.status)));
        }
        if !self.board.contains(&key_word) {
            return Err(self.invalid("key word must be on the board"));
        }
        self.key_word = Some(key_word);
        self.current_round = 1;
        self.status = SessionStatus::Active;
        self.turn = Turn::Witness { dilemma };
        info!(round = 1, "Session active");
        Ok(())
    }

    /// `WitnessTurn(n) → DetectiveTurn(n)`. Returns the dilemma that was
    /// answered.
    #[instrument(skip(self), fields(session_id = %self.id, round = self.current_round))]
    pub(crate) fn record_witness_choice(&mut self, choice: &str) -> Result<Dilemma, EngineError> {
        let dilemma = match &self.turn {
            Turn::Witness { dilemma } => dilemma.clone(),
            other => {
                return Err(self.invalid(format!(
                    "not the Witness's turn ({})",
                    phase_name(other)
                )));
            }
        };
        if !dilemma.offers(choice) {
            warn!(choice, %dilemma, "Choice not offered");
            return Err(MoveError::ChoiceNotOffered {
                choice: choice.to_string(),
                dilemma,
            }
            .into());
        }
        self.turn = Turn::Detective {
            dilemma: dilemma.clone(),
            witness_choice: choice.to_string(),
        };
        debug!(choice, "Witness choice recorded");
        Ok(dilemma)
    }

    /// Removes the validated words from the board. Returns whether the key
    /// word was among them.
    #[instrument(
        skip(self, elimination),
        fields(session_id = %self.id, round = self.current_round)
    )]
    pub(crate) fn eliminate(&mut self, elimination: &Elimination) -> Result<bool, EngineError> {
        if !matches!(self.turn, Turn::Detective { .. }) {
            return Err(self.invalid(format!(
                "not the Detective's turn ({})",
                phase_name(&self.turn)
            )));
        }
        let key_word = self
            .key_word
            .clone()
            .ok_or_else(|| self.invalid("no key word"))?;
        let requested: HashSet<&str> = elimination.words().iter().map(String::as_str).collect();
        let removed = self.board.remove(&requested);
        debug!(removed = removed.len(), remaining = self.board.len(), "Words eliminated");
        Ok(elimination.removes(&key_word))
    }

    /// `DetectiveTurn(n) → WitnessTurn(n+1)`.
    #[instrument(skip(self, dilemma), fields(session_id = %self.id, round = self.current_round))]
    pub(crate) fn advance_round(&mut self, dilemma: Dilemma) -> Result<u8, EngineError> {
        if !matches!(self.turn, Turn::Detective { .. }) {
            return Err(self.invalid("round can only advance after the Detective's turn"));
        }
        if self.current_round >= self.rules.max_rounds {
            return Err(self.invalid("no rounds left"));
        }
        self.current_round += 1;
        self.turn = Turn::Witness { dilemma };
        info!(round = self.current_round, "Round advanced");
        Ok(self.current_round)
    }

    /// `Active → Completed`.
    #[instrument(skip(self), fields(session_id = %self.id, round = self.current_round))]
    pub(crate) fn complete(
        &mut self,
        outcome: Outcome,
        key_word_eliminated: bool,
    ) -> Result<(), EngineError> {
        if self.status != SessionStatus::Active {
            return Err(self.invalid(format!("cannot complete a {} session", self.status)));
        }
        self.status = SessionStatus::Completed;
        self.turn = Turn::Finished {
            outcome,
            key_word_eliminated,
        };
        info!(?outcome, key_word_eliminated, remaining = self.board.len(), "Session completed");
        Ok(())
    }
}

fn phase_name(turn: &Turn) -> &'static str {
    match turn {
        Turn::Waiting => "waiting",
        Turn::Witness { .. } => "witness turn",
        Turn::Detective { .. } => "detective turn",
        Turn::Finished { .. } => "finished",
    }
}

/// Owns all sessions.
///
/// The outer map lock is held only long enough to find a session; each
/// session then has its own lock, so different sessions never block each
/// other.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating session store");
        Self::default()
    }

    fn entry(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Creates a pending session over `board`.
    #[instrument(skip(self, board))]
    pub fn create(&self, board: Board, rules: GameRules) -> SessionId {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), board, rules);
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        id
    }

    /// Snapshot of a session.
    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Option<Session> {
        let session = self.entry(id).map(|s| lock(&s).clone());
        if session.is_none() {
            debug!(session_id = id, "Session not found");
        }
        session
    }

    /// Runs `f` on the live session while holding its lock, so no
    /// transition can commit between the read and whatever `f` does.
    #[instrument(skip(self, f))]
    pub fn inspect<R>(&self, id: &str, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let entry = self.entry(id)?;
        let guard = lock(&entry);
        Some(f(&guard))
    }

    /// Atomically places `client_id` in `role`.
    #[instrument(skip(self))]
    pub fn fill_role(
        &self,
        id: &str,
        role: Role,
        client_id: &str,
    ) -> Result<SessionStatus, EngineError> {
        self.transact(id, |session| session.fill_role(role, client_id))
    }

    /// Runs `f` on a working copy of the session inside its critical
    /// section and commits the copy only if `f` succeeds and the session
    /// invariants still hold.
    #[instrument(skip(self, f))]
    pub fn transact<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Session) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| EngineError::invalid_state(id, "unknown session"))?;
        let mut guard = lock(&entry);

        let mut working = guard.clone();
        let value = f(&mut working)?;

        if let Err(violations) = invariants::check_transition(&guard, &working) {
            error!(session_id = id, ?violations, "Transition rejected by invariants");
            return Err(EngineError::invalid_state(
                id,
                format!("invariant violated: {}", violations.join("; ")),
            ));
        }

        *guard = working;
        Ok(value)
    }

    /// Number of sessions ever created.
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when no session exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(words: &[&str]) -> Board {
        Board::new(words.iter().map(|w| w.to_string()))
    }

    fn ready_session() -> Session {
        let mut s = Session::new("s".into(), board(&["A", "B", "C"]), GameRules::default());
        s.fill_role(Role::Witness, "w").unwrap();
        s.fill_role(Role::Detective, "d").unwrap();
        s
    }

    #[test]
    fn test_fill_second_role_makes_ready() {
        let mut s = Session::new("s".into(), board(&["A", "B"]), GameRules::default());
        assert_eq!(s.fill_role(Role::Detective, "d").unwrap(), SessionStatus::Pending);
        assert_eq!(s.open_role(), Some(Role::Witness));
        assert_eq!(s.fill_role(Role::Witness, "w").unwrap(), SessionStatus::Ready);
        assert_eq!(s.participants(), ["w", "d"]);
    }

    #[test]
    fn test_fill_occupied_role_conflicts() {
        let mut s = Session::new("s".into(), board(&["A", "B"]), GameRules::default());
        s.fill_role(Role::Witness, "w1").unwrap();
        let err = s.fill_role(Role::Witness, "w2").unwrap_err();
        assert!(matches!(err, EngineError::ConcurrencyConflict { role: Role::Witness, .. }));
    }

    #[test]
    fn test_same_client_cannot_take_both_roles() {
        let mut s = Session::new("s".into(), board(&["A", "B"]), GameRules::default());
        s.fill_role(Role::Witness, "c").unwrap();
        let err = s.fill_role(Role::Detective, "c").unwrap_err();
        assert!(matches!(err, EngineError::InvalidClient { .. }));
        assert_eq!(*s.status(), SessionStatus::Pending);
    }

    #[test]
    fn test_activate_requires_ready() {
        let mut s = Session::new("s".into(), board(&["A", "B"]), GameRules::default());
        let err = s.activate("A".into(), Dilemma::new("x", "y")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSessionState { .. }));
    }

    #[test]
    fn test_witness_choice_must_be_offered() {
        let mut s = ready_session();
        s.activate("A".into(), Dilemma::new("Soft", "Hard")).unwrap();
        let err = s.record_witness_choice("Medium").unwrap_err();
        assert!(matches!(err, EngineError::InvalidMove(MoveError::ChoiceNotOffered { .. })));
        assert!(matches!(s.turn(), Turn::Witness { .. }));
    }

    #[test]
    fn test_detective_cannot_move_during_witness_turn() {
        let mut s = ready_session();
        s.activate("A".into(), Dilemma::new("Soft", "Hard")).unwrap();
        let e = Elimination::validate(s.board(), &["B".to_string()]).unwrap();
        let err = s.eliminate(&e).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSessionState { .. }));
    }

    #[test]
    fn test_store_transact_rolls_back_on_error() {
        let store = SessionStore::new();
        let id = store.create(board(&["A", "B"]), GameRules::default());
        store.fill_role(&id, Role::Witness, "w").unwrap();

        let result: Result<(), EngineError> = store.transact(&id, |s| {
            s.fill_role(Role::Detective, "d")?;
            Err(EngineError::invalid_state("x", "forced failure"))
        });
        assert!(result.is_err());

        let s = store.get(&id).unwrap();
        assert_eq!(*s.status(), SessionStatus::Pending);
        assert!(s.detective_id().is_none());
    }

    #[test]
    fn test_store_unknown_session() {
        let store = SessionStore::new();
        let err = store.fill_role("nope", Role::Witness, "w").unwrap_err();
        assert!(matches!(err, EngineError::InvalidSessionState { .. }));
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn test_store_create_starts_pending() {
        let store = SessionStore::new();
        let id = store.create(board(&["A", "B"]), GameRules::default());
        assert_eq!(store.len(), 1);
        assert_eq!(*store.get(&id).unwrap().status(), SessionStatus::Pending);
    }

    #[test]
    fn test_inspect_blocks_transitions_until_done() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let store = Arc::new(SessionStore::new());
        let id = store.create(board(&["A", "B"]), GameRules::default());
        let inspected = Arc::new(AtomicBool::new(false));
        let (entered_tx, entered_rx) = mpsc::channel();

        let reader = {
            let store = Arc::clone(&store);
            let inspected = Arc::clone(&inspected);
            let id = id.clone();
            thread::spawn(move || {
                store.inspect(&id, |s| {
                    entered_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(50));
                    inspected.store(true, Ordering::SeqCst);
                    s.witness_id().clone()
                })
            })
        };

        entered_rx.recv().unwrap();
        store.fill_role(&id, Role::Witness, "w").unwrap();
        assert!(inspected.load(Ordering::SeqCst));
        assert_eq!(reader.join().unwrap(), Some(None));
        assert!(store.inspect("nope", |_| ()).is_none());
    }
}
