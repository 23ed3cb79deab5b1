//! Player submissions and the ways they can be rejected.
//!
//! Submissions are validated against the session before anything is applied,
//! so a rejected move never leaves a partial change behind.

use std::collections::HashSet;
use tracing::instrument;

use super::{Board, Dilemma};

/// Why a submission was rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MoveError {
    /// The Witness named something other than the two dilemma terms.
    #[display("'{}' is not one of the presented terms ({})", choice, dilemma)]
    ChoiceNotOffered {
        /// The submitted choice.
        choice: String,
        /// The dilemma that was presented.
        dilemma: Dilemma,
    },

    /// The Detective submitted no words.
    #[display("Elimination must name at least one word")]
    EmptyElimination,

    /// None of the requested words is on the board.
    #[display("None of the requested words are on the board")]
    NoBoardWords,
}

impl std::error::Error for MoveError {}

/// A validated elimination: the distinct requested words that are on the
/// board, ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elimination {
    words: Vec<String>,
}

impl Elimination {
    /// Validates `requested` against `board`.
    ///
    /// Duplicate and off-board entries are ignored, so a request is judged
    /// only by the board words it names. It must be non-empty and must touch
    /// at least one board word.
    #[instrument(
        skip(board, requested),
        fields(requested = requested.len(), remaining = board.len())
    )]
    pub fn validate(board: &Board, requested: &[String]) -> Result<Self, MoveError> {
        if requested.is_empty() {
            return Err(MoveError::EmptyElimination);
        }

        let distinct: HashSet<&str> = requested.iter().map(String::as_str).collect();
        let words: Vec<String> = board
            .words()
            .iter()
            .filter(|w| distinct.contains(w.as_str()))
            .cloned()
            .collect();
        if words.is_empty() {
            return Err(MoveError::NoBoardWords);
        }

        Ok(Self { words })
    }

    /// Board words this elimination removes, in board order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Whether the elimination removes `word`.
    pub fn removes(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }
}
