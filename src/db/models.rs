//! Database models and domain conversions.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;

use crate::client::Client;
use crate::db::{DbError, schema};
use crate::games::hard_to_get::Outcome;
use crate::recorder::GameResult;
use crate::session::Session;

/// Client database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::clients)]
pub struct ClientRow {
    id: String,
    model_name: String,
    status: String,
    session_id: Option<String>,
    registered_at: NaiveDateTime,
}

/// Insertable client model.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::clients)]
pub struct NewClientRow {
    id: String,
    model_name: String,
    status: String,
    session_id: Option<String>,
}

impl From<&Client> for NewClientRow {
    fn from(client: &Client) -> Self {
        Self::new(
            client.id().clone(),
            client.model_name().clone(),
            client.status().as_ref().to_string(),
            client.session_id().clone(),
        )
    }
}

/// Session snapshot database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::sessions)]
pub struct SessionRow {
    id: String,
    witness_id: Option<String>,
    detective_id: Option<String>,
    status: String,
    key_word: Option<String>,
    current_round: i32,
    board: String,
    updated_at: NaiveDateTime,
}

impl SessionRow {
    /// Decodes the stored board.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn board_words(&self) -> Result<Vec<String>, DbError> {
        Ok(serde_json::from_str(&self.board)?)
    }
}

/// Insertable session snapshot.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::sessions)]
pub struct NewSessionRow {
    id: String,
    witness_id: Option<String>,
    detective_id: Option<String>,
    status: String,
    key_word: Option<String>,
    current_round: i32,
    board: String,
}

impl NewSessionRow {
    /// Snapshots `session`, board encoded as a JSON array.
    #[instrument(skip(session), fields(session_id = %session.id()))]
    pub fn from_session(session: &Session) -> Result<Self, DbError> {
        Ok(Self::new(
            session.id().clone(),
            session.witness_id().clone(),
            session.detective_id().clone(),
            session.status().as_ref().to_string(),
            session.key_word().clone(),
            i32::from(*session.current_round()),
            serde_json::to_string(session.board().words())?,
        ))
    }
}

/// Game result database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::results)]
#[diesel(primary_key(session_id))]
pub struct ResultRow {
    session_id: String,
    witness_id: String,
    witness_model: String,
    detective_id: String,
    detective_model: String,
    outcome: String,
    key_word: String,
    final_board: String,
    rounds_played: i32,
    recorded_at: NaiveDateTime,
}

impl ResultRow {
    /// Parses the stored outcome string into an [`Outcome`].
    #[instrument(skip(self), fields(outcome = %self.outcome))]
    pub fn parse_outcome(&self) -> Result<Outcome, DbError> {
        Outcome::from_db_string(&self.outcome)
    }

    /// Decodes the stored final board.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub fn final_board_words(&self) -> Result<Vec<String>, DbError> {
        Ok(serde_json::from_str(&self.final_board)?)
    }
}

/// Insertable game result.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::results)]
pub struct NewResultRow {
    session_id: String,
    witness_id: String,
    witness_model: String,
    detective_id: String,
    detective_model: String,
    outcome: String,
    key_word: String,
    final_board: String,
    rounds_played: i32,
}

impl NewResultRow {
    /// Converts a terminal result for storage.
    #[instrument(skip(result), fields(session_id = %result.session_id))]
    pub fn from_result(result: &GameResult) -> Result<Self, DbError> {
        Ok(Self::new(
            result.session_id.clone(),
            result.witness_id.clone(),
            result.witness_model.clone(),
            result.detective_id.clone(),
            result.detective_model.clone(),
            result.outcome.to_db_string().to_string(),
            result.key_word.clone(),
            serde_json::to_string(&result.final_board)?,
            i32::from(result.rounds_played),
        ))
    }
}

impl Outcome {
    /// Converts outcome to the string stored in the database.
    #[instrument]
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
        }
    }

    /// Parses outcome from the string stored in the database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the string is not a valid outcome value.
    #[instrument(skip(s), fields(s = %s))]
    pub fn from_db_string(s: &str) -> Result<Self, DbError> {
        match s {
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            _ => Err(DbError::new(format!("Invalid outcome: '{}'", s))),
        }
    }
}

/// Aggregated record of one model label across both roles.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ModelStats {
    model_name: String,
    detective_games: i32,
    detective_wins: i32,
    witness_games: i32,
    witness_wins: i32,
}

impl ModelStats {
    /// Creates new aggregated statistics.
    #[instrument]
    pub fn new(
        model_name: String,
        detective_games: i32,
        detective_wins: i32,
        witness_games: i32,
        witness_wins: i32,
    ) -> Self {
        Self {
            model_name,
            detective_games,
            detective_wins,
            witness_games,
            witness_wins,
        }
    }

    /// Total games played in either role.
    pub fn total_games(&self) -> i32 {
        self.detective_games + self.witness_games
    }

    /// Detective win rate as a percentage (0.0–100.0).
    #[instrument(skip(self))]
    pub fn detective_win_rate(&self) -> f64 {
        rate(self.detective_wins, self.detective_games)
    }

    /// Witness win rate as a percentage (0.0–100.0). The Witness wins
    /// whenever the Detective loses.
    #[instrument(skip(self))]
    pub fn witness_win_rate(&self) -> f64 {
        rate(self.witness_wins, self.witness_games)
    }
}

fn rate(wins: i32, games: i32) -> f64 {
    if games == 0 {
        0.0
    } else {
        (wins as f64 / games as f64) * 100.0
    }
}
