//! Core domain types for Hard to Get.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::instrument;

/// Role a client plays in a session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Role {
    /// Holds the key word and answers dilemmas.
    #[serde(alias = "witness")]
    Witness,
    /// Eliminates board words trying to isolate the key word.
    #[serde(alias = "detective")]
    Detective,
}

impl Role {
    /// Returns the other role.
    pub fn opposite(self) -> Self {
        match self {
            Role::Witness => Role::Detective,
            Role::Detective => Role::Witness,
        }
    }
}

/// A pair of mutually exclusive terms presented once per round.
///
/// Serializes as a two-element array, `["Soft", "Hard"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Dilemma(pub String, pub String);

impl Dilemma {
    /// Creates a dilemma from its two sides.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self(left.into(), right.into())
    }

    /// Left-hand term.
    pub fn left(&self) -> &str {
        &self.0
    }

    /// Right-hand term.
    pub fn right(&self) -> &str {
        &self.1
    }

    /// Whether `choice` names one of the two terms exactly.
    pub fn offers(&self, choice: &str) -> bool {
        self.0 == choice || self.1 == choice
    }
}

impl std::fmt::Display for Dilemma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} vs {}", self.0, self.1)
    }
}

/// Ordered set of distinct candidate words.
///
/// Membership only ever shrinks: the only mutator is [`Board::remove`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    words: Vec<String>,
}

impl Board {
    /// Builds a board from `words`, dropping later duplicates.
    #[instrument(skip(words))]
    pub fn new(words: impl IntoIterator<Item = String>) -> Self {
        let mut seen = HashSet::new();
        let words = words
            .into_iter()
            .filter(|w| seen.insert(w.clone()))
            .collect();
        Self { words }
    }

    /// Words in board order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Number of words remaining.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True once every word has been removed.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether `word` is still on the board.
    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// True when `word` is the only word left.
    pub fn is_only(&self, word: &str) -> bool {
        self.words.len() == 1 && self.words[0] == word
    }

    /// Removes every board word listed in `words`, returning the removed
    /// words in board order. Words not on the board are ignored.
    #[instrument(skip(self, words), fields(before = self.words.len()))]
    pub fn remove(&mut self, words: &HashSet<&str>) -> Vec<String> {
        let (removed, kept): (Vec<String>, Vec<String>) = std::mem::take(&mut self.words)
            .into_iter()
            .partition(|w| words.contains(w.as_str()));
        self.words = kept;
        removed
    }

    /// Whether every word on `self` is also on `earlier`.
    pub fn is_subset_of(&self, earlier: &Board) -> bool {
        self.words.iter().all(|w| earlier.contains(w))
    }
}

/// Terminal outcome, from the Detective's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Only the key word remained.
    Win,
    /// The key word was eliminated or never isolated.
    Loss,
}

impl Outcome {
    /// True for [`Outcome::Win`].
    pub fn is_win(self) -> bool {
        matches!(self, Outcome::Win)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(words: &[&str]) -> Board {
        Board::new(words.iter().map(|w| w.to_string()))
    }

    #[test]
    fn test_board_drops_duplicates_keeping_order() {
        let b = board(&["Cobra", "Eagle", "Cobra", "Spider"]);
        assert_eq!(b.words(), ["Cobra", "Eagle", "Spider"]);
    }

    #[test]
    fn test_remove_ignores_words_not_on_board() {
        let mut b = board(&["Cobra", "Eagle", "Spider"]);
        let removed = b.remove(&HashSet::from(["Eagle", "Piano"]));
        assert_eq!(removed, ["Eagle"]);
        assert_eq!(b.words(), ["Cobra", "Spider"]);
    }

    #[test]
    fn test_is_only() {
        let b = board(&["Cobra"]);
        assert!(b.is_only("Cobra"));
        assert!(!b.is_only("Eagle"));
        assert!(!board(&["Cobra", "Eagle"]).is_only("Cobra"));
    }

    #[test]
    fn test_dilemma_offers_exact_terms_only() {
        let d = Dilemma::new("Soft", "Hard");
        assert!(d.offers("Soft"));
        assert!(d.offers("Hard"));
        assert!(!d.offers("soft"));
        assert!(!d.offers(""));
    }

    #[test]
    fn test_dilemma_serializes_as_pair() {
        let json = serde_json::to_string(&Dilemma::new("Dry", "Wet")).unwrap();
        assert_eq!(json, r#"["Dry","Wet"]"#);
    }

    #[test]
    fn test_role_opposite() {
        assert_eq!(Role::Witness.opposite(), Role::Detective);
        assert_eq!(Role::Detective.opposite(), Role::Witness);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Witness).unwrap(), r#""Witness""#);
        let parsed: Role = serde_json::from_str(r#""Detective""#).unwrap();
        assert_eq!(parsed, Role::Detective);
        let parsed: Role = serde_json::from_str(r#""witness""#).unwrap();
        assert_eq!(parsed, Role::Witness);
    }
}
