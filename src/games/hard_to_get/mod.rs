//! Hard to Get: a Witness steers a Detective away from a secret key word.

mod action;
mod corpus;
pub mod invariants;
mod round;
mod rules;
mod types;

pub use action::{Elimination, MoveError};
pub use corpus::{Corpus, CorpusError};
pub use round::{ChoiceAccepted, EliminationApplied, Resolution, RoundEngine, RoundStarted};
pub use rules::{BOARD_SIZE, GameRules, MAX_ROUNDS, Verdict, judge};
pub use types::{Board, Dilemma, Outcome, Role};
