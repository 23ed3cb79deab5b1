//! Word and dilemma corpus.
//!
//! The corpus is loaded once and then only read, so it is shared behind an
//! `Arc` without locking.

use rand::Rng;
use rand::seq::SliceRandom;
use std::path::Path;
use tracing::{debug, info, instrument};

use super::{Board, Dilemma};

const BUILTIN_WORDS: &[&str] = &[
    "The Lion King", "Beyonce", "Virtual reality", "Smart phone", "Salad",
    "Doughnut", "Basketball", "Bowling", "Bookshelf", "Grand Theft Auto",
    "Anxiety", "Canada", "Hawaii", "Avengers", "Giraffe", "Sausage",
    "Madonna", "Harry Styles", "Corn dog", "Nachos", "Thor", "James Bond",
    "Hash browns", "Oatmeal", "Solar system", "Bridge", "Cobra", "Spider",
    "Eagle", "Poison ivy", "Mount Everest", "Star Wars", "Rowboat",
    "Horoscope", "Coffee", "Telescope", "Piano", "Guitar", "Diamond",
    "Football", "Swimming", "Mountain", "Ocean", "Desert", "Forest",
    "Space station", "Chocolate", "Vanilla", "Strawberry", "Winter",
    "Summer", "Spring", "Fall", "Wedding", "Funeral", "Birthday",
    "Anniversary", "Hospital", "School", "University", "Library",
    "Museum", "Theater", "Cinema", "Restaurant", "Cafe", "Park",
    "Beach", "Lake", "River", "Island", "Continent", "Planet",
    "Galaxy", "Universe", "Atom", "Molecule", "Cell", "Tissue",
    "Organ", "System", "Body", "Mind", "Soul", "Spirit",
    "Angel", "Demon", "Ghost", "Vampire", "Werewolf", "Zombie",
    "Robot", "Cyborg", "Android", "AI", "VR", "AR", "MR",
    "Cloud", "Rain", "Snow", "Hail", "Sleet", "Fog", "Mist",
];

const BUILTIN_DILEMMAS: &[(&str, &str)] = &[
    ("Sinner", "Saint"), ("Soft", "Hard"), ("Dry", "Wet"), ("Slow", "Fast"),
    ("Where's Waldo", "Walter White"), ("Superman", "Batman"),
    ("Ghost town", "Metropolis"), ("Puddle", "Fountain"), ("Nature", "Nurture"),
    ("Coca-Cola", "Pepsi"), ("Checkers", "Chess"), ("Microscope", "Telescope"),
    ("Jam", "Jelly"), ("Solution", "Problem"), ("Rollerskating", "Skateboarding"),
    ("Store bought", "Homemade"), ("Fight", "Flight"), ("Peanut", "Pistachio"),
    ("Dinner", "Breakfast"), ("Sour", "Sweet"), ("Heavy", "Light"),
    ("Introvert", "Extrovert"), ("Online", "Offline"), ("Public", "Private"),
    ("Analog", "Digital"), ("Manual", "Automatic"), ("Simple", "Complex"),
];

/// Why a corpus could not be built or sampled.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum CorpusError {
    /// A corpus file could not be read.
    #[display("Failed to read {}: {}", path, reason)]
    Io {
        /// Offending path.
        path: String,
        /// Underlying error.
        reason: String,
    },

    /// A dilemma line was not two distinct, non-empty, comma-separated terms.
    #[display("Malformed dilemma on line {}: '{}'", line, text)]
    MalformedDilemma {
        /// 1-based line number.
        line: usize,
        /// The raw line.
        text: String,
    },

    /// Not enough distinct words to fill a board.
    #[display("Corpus has {} distinct words, a board needs {}", available, needed)]
    TooFewWords {
        /// Distinct words available.
        available: usize,
        /// Words required.
        needed: usize,
    },

    /// No dilemmas at all.
    #[display("Corpus has no dilemmas")]
    NoDilemmas,
}

impl std::error::Error for CorpusError {}

/// Read-only source of board words and dilemmas.
#[derive(Debug, Clone)]
pub struct Corpus {
    words: Vec<String>,
    dilemmas: Vec<Dilemma>,
}

impl Corpus {
    /// Builds a corpus, dropping duplicate words.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::NoDilemmas`] if `dilemmas` is empty.
    #[instrument(skip(words, dilemmas))]
    pub fn new(
        words: impl IntoIterator<Item = String>,
        dilemmas: Vec<Dilemma>,
    ) -> Result<Self, CorpusError> {
        if dilemmas.is_empty() {
            return Err(CorpusError::NoDilemmas);
        }
        let words = Board::new(words).words().to_vec();
        info!(words = words.len(), dilemmas = dilemmas.len(), "Corpus built");
        Ok(Self { words, dilemmas })
    }

    /// The corpus shipped with the crate.
    pub fn builtin() -> Self {
        Self {
            words: BUILTIN_WORDS.iter().map(|w| w.to_string()).collect(),
            dilemmas: BUILTIN_DILEMMAS
                .iter()
                .map(|(l, r)| Dilemma::new(*l, *r))
                .collect(),
        }
    }

    /// Loads a corpus from a word file (one per line) and a dilemma file
    /// (`left,right` per line). Blank lines are skipped.
    #[instrument(
        skip(words_path, dilemmas_path),
        fields(
            words = %words_path.as_ref().display(),
            dilemmas = %dilemmas_path.as_ref().display()
        )
    )]
    pub fn from_files(
        words_path: impl AsRef<Path>,
        dilemmas_path: impl AsRef<Path>,
    ) -> Result<Self, CorpusError> {
        let words = read(words_path.as_ref())?;
        let dilemmas = parse_dilemmas(&read(dilemmas_path.as_ref())?)?;
        Self::new(
            words
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
            dilemmas,
        )
    }

    /// All distinct words.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// All dilemmas.
    pub fn dilemmas(&self) -> &[Dilemma] {
        &self.dilemmas
    }

    /// Fails when fewer than `size` distinct words are available.
    pub fn ensure_board_size(&self, size: usize) -> Result<(), CorpusError> {
        if self.words.len() < size {
            return Err(CorpusError::TooFewWords {
                available: self.words.len(),
                needed: size,
            });
        }
        Ok(())
    }

    /// Draws `size` distinct words uniformly, in random order.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::TooFewWords`] when the corpus is too small.
    #[instrument(skip(self, rng))]
    pub fn sample_board<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        size: usize,
    ) -> Result<Board, CorpusError> {
        self.ensure_board_size(size)?;
        let mut picked: Vec<String> = self.words.choose_multiple(rng, size).cloned().collect();
        picked.shuffle(rng);
        debug!(size, "Sampled board");
        Ok(Board::new(picked))
    }

    /// Draws one dilemma uniformly.
    #[instrument(skip(self, rng))]
    pub fn draw_dilemma<R: Rng + ?Sized>(&self, rng: &mut R) -> Dilemma {
        let index = rng.gen_range(0..self.dilemmas.len());
        self.dilemmas[index].clone()
    }
}

fn read(path: &Path) -> Result<String, CorpusError> {
    std::fs::read_to_string(path).map_err(|e| CorpusError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn parse_dilemmas(text: &str) -> Result<Vec<Dilemma>, CorpusError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let malformed = || CorpusError::MalformedDilemma {
                line: i + 1,
                text: line.to_string(),
            };
            let (left, right) = line.split_once(',').ok_or_else(malformed)?;
            let (left, right) = (left.trim(), right.trim());
            if left.is_empty() || right.is_empty() || left == right {
                return Err(malformed());
            }
            Ok(Dilemma::new(left, right))
        })
        .collect()
}
