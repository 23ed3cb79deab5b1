//! Termination rules for Hard to Get.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{Board, Outcome};

/// Default number of words on a fresh board.
pub const BOARD_SIZE: usize = 16;

/// Default last permitted round.
pub const MAX_ROUNDS: u8 = 5;

/// Tunable game parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRules {
    /// Words drawn for each new board.
    pub board_size: usize,
    /// Last permitted round; its Detective turn always ends the game.
    pub max_rounds: u8,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            board_size: BOARD_SIZE,
            max_rounds: MAX_ROUNDS,
        }
    }
}

/// What happens after an elimination has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Play continues with the next round.
    Continue,
    /// The session is over.
    Finished(Outcome),
}

/// Judges the board after the Detective's elimination in `round`.
///
/// Precedence: eliminating the key word loses; isolating it wins; reaching
/// the last round without isolating it loses.
#[instrument(skip(board), fields(remaining = board.len()))]
pub fn judge(
    board: &Board,
    key_word: &str,
    key_word_eliminated: bool,
    round: u8,
    rules: &GameRules,
) -> Verdict {
    if key_word_eliminated {
        return Verdict::Finished(Outcome::Loss);
    }

    if board.is_only(key_word) {
        return Verdict::Finished(Outcome::Win);
    }

    if round >= rules.max_rounds {
        return Verdict::Finished(Outcome::Loss);
    }

    Verdict::Continue
}
