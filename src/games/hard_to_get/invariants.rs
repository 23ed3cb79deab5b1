//! Session invariants.
//!
//! Invariants are logical properties that must hold after every committed
//! transition. The session store checks them before committing, so a
//! violating transition is rejected instead of stored.

use crate::session::{Session, SessionStatus, Turn};

/// A logical property that must hold for a given state.
pub trait Invariant<S: ?Sized> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// A session before and after one transition.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    /// Committed state.
    pub before: &'a Session,
    /// Proposed state.
    pub after: &'a Session,
}

/// Ready, active and completed sessions have two distinct participants.
pub struct BothRolesFilled;

impl Invariant<Session> for BothRolesFilled {
    fn holds(session: &Session) -> bool {
        if *session.status() == SessionStatus::Pending {
            return true;
        }
        match (session.witness_id(), session.detective_id()) {
            (Some(w), Some(d)) => w != d,
            _ => false,
        }
    }

    fn description() -> &'static str {
        "Non-pending sessions have a distinct Witness and Detective"
    }
}

/// While play is ongoing the key word is on the board.
pub struct KeyWordOnBoard;

impl Invariant<Session> for KeyWordOnBoard {
    fn holds(session: &Session) -> bool {
        if *session.status() != SessionStatus::Active {
            return true;
        }
        session
            .key_word()
            .as_deref()
            .is_some_and(|k| session.board().contains(k))
    }

    fn description() -> &'static str {
        "Key word stays on the board while the session is active"
    }
}

/// The round counter never passes the cap, and is zero before activation.
pub struct RoundCap;

impl Invariant<Session> for RoundCap {
    fn holds(session: &Session) -> bool {
        let round = *session.current_round();
        match session.status() {
            SessionStatus::Pending | SessionStatus::Ready => round == 0,
            SessionStatus::Active | SessionStatus::Completed => {
                (1..=session.rules().max_rounds).contains(&round)
            }
        }
    }

    fn description() -> &'static str {
        "Round is 0 before activation and never exceeds the maximum"
    }
}

/// A completed session always records how it finished.
pub struct CompletedIsFinished;

impl Invariant<Session> for CompletedIsFinished {
    fn holds(session: &Session) -> bool {
        session.is_completed() == matches!(session.turn(), Turn::Finished { .. })
    }

    fn description() -> &'static str {
        "Completed sessions, and only they, carry a final outcome"
    }
}

/// Board words are only ever removed.
pub struct MonotonicBoard;

impl Invariant<Transition<'_>> for MonotonicBoard {
    fn holds(t: &Transition<'_>) -> bool {
        t.after.board().is_subset_of(t.before.board())
    }

    fn description() -> &'static str {
        "Board membership never grows"
    }
}

/// Status and round only move forward.
pub struct ForwardOnly;

impl Invariant<Transition<'_>> for ForwardOnly {
    fn holds(t: &Transition<'_>) -> bool {
        t.after.status() >= t.before.status()
            && t.after.current_round() >= t.before.current_round()
            && (t.before.key_word().is_none() || t.after.key_word() == t.before.key_word())
    }

    fn description() -> &'static str {
        "Status and round never go backwards and the key word never changes"
    }
}

fn collect<S: ?Sized, I: Invariant<S>>(state: &S, violations: &mut Vec<String>) {
    if !I::holds(state) {
        violations.push(I::description().to_string());
    }
}

/// Checks every per-state invariant.
pub fn check(session: &Session) -> Result<(), Vec<String>> {
    let mut violations = Vec::new();
    collect::<_, BothRolesFilled>(session, &mut violations);
    collect::<_, KeyWordOnBoard>(session, &mut violations);
    collect::<_, RoundCap>(session, &mut violations);
    collect::<_, CompletedIsFinished>(session, &mut violations);
    if violations.is_empty() { Ok(()) } else { Err(violations) }
}

/// Checks the proposed state and the transition that produced it.
pub fn check_transition(before: &Session, after: &Session) -> Result<(), Vec<String>> {
    let mut violations = check(after).err().unwrap_or_default();
    let transition = Transition { before, after };
    collect::<_, MonotonicBoard>(&transition, &mut violations);
    collect::<_, ForwardOnly>(&transition, &mut violations);
    if violations.is_empty() { Ok(()) } else { Err(violations) }
}
