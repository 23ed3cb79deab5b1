//! Pairs searching clients into sessions.
//!
//! The whole search-and-assign sequence runs under the pending-pool lock,
//! the only global critical section in the engine.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

use crate::client::ClientRegistry;
use crate::error::EngineError;
use crate::games::hard_to_get::{Corpus, GameRules, Role};
use crate::random::RandomSource;
use crate::session::{SessionId, SessionStatus, SessionStore, lock};

/// Where a join placed the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Session joined or created.
    pub session_id: SessionId,
    /// Role the client holds.
    pub role: Role,
    /// Board at assignment time.
    pub board: Vec<String>,
    /// True when this join filled the second role.
    pub session_ready: bool,
}

/// Pending-session pool plus the policy for filling it.
#[derive(Debug)]
pub struct Matchmaker {
    /// Sessions missing a participant, oldest first.
    pending: Mutex<Vec<SessionId>>,
    corpus: Arc<Corpus>,
    rng: RandomSource,
    rules: GameRules,
}

impl Matchmaker {
    /// Creates a matchmaker that builds new boards from `corpus`.
    #[instrument(skip(corpus, rng))]
    pub fn new(corpus: Arc<Corpus>, rng: RandomSource, rules: GameRules) -> Self {
        info!("Creating matchmaker");
        Self {
            pending: Mutex::new(Vec::new()),
            corpus,
            rng,
            rules,
        }
    }

    /// Number of sessions waiting for a second client.
    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Places `client_id` in a session.
    ///
    /// A preferred role joins the oldest pending session missing that role;
    /// no preference joins the oldest pending session with any open slot.
    /// Otherwise a new session is created with the preferred role, or a
    /// random one.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidClient`] for unknown or already-assigned clients
    /// - [`EngineError::ConcurrencyConflict`] if the chosen slot was taken
    /// - [`EngineError::Corpus`] if no board can be drawn
    #[instrument(skip(self, store, registry))]
    pub fn assign(
        &self,
        store: &SessionStore,
        registry: &ClientRegistry,
        client_id: &str,
        preferred: Option<Role>,
    ) -> Result<Assignment, EngineError> {
        let mut pending = lock(&self.pending);
        registry.begin_search(client_id)?;

        // Drop entries that stopped being pending.
        pending.retain(|id| {
            store
                .get(id)
                .is_some_and(|s| *s.status() == SessionStatus::Pending)
        });

        let candidate = pending.iter().enumerate().find_map(|(index, id)| {
            let open = store.get(id)?.open_role()?;
            match preferred {
                Some(role) if role != open => None,
                _ => Some((index, id.clone(), open)),
            }
        });

        let (session_id, role, status) = match candidate {
            Some((index, session_id, role)) => {
                debug!(session_id = %session_id, %role, "Joining pending session");
                let status = store.fill_role(&session_id, role, client_id)?;
                if status != SessionStatus::Pending {
                    pending.remove(index);
                }
                (session_id, role, status)
            }
            None => {
                let board = self
                    .rng
                    .with(|rng| self.corpus.sample_board(rng, self.rules.board_size))?;
                let role = preferred.unwrap_or_else(|| {
                    self.rng.with(|rng| {
                        if rng.gen_bool(0.5) {
                            Role::Witness
                        } else {
                            Role::Detective
                        }
                    })
                });
                let session_id = store.create(board, self.rules);
                let status = store.fill_role(&session_id, role, client_id)?;
                pending.push(session_id.clone());
                info!(session_id = %session_id, %role, "Created session for client");
                (session_id, role, status)
            }
        };

        registry.assign(client_id, &session_id)?;

        let board = store
            .get(&session_id)
            .map(|s| s.board().words().to_vec())
            .unwrap_or_default();

        info!(session_id = %session_id, %role, %status, "Client assigned");
        Ok(Assignment {
            session_id,
            role,
            board,
            session_ready: status == SessionStatus::Ready,
        })
    }
}
