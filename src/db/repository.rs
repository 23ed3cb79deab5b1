//! Database repository for clients, session snapshots and results.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};

use crate::db::{
    ClientRow, DbError, ModelStats, NewClientRow, NewResultRow, NewSessionRow, ResultRow,
    SessionRow, schema,
};

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database repository for game persistence.
#[derive(Debug, Clone)]
pub struct GameRepository {
    db_path: String,
}

impl GameRepository {
    /// Creates a new repository for the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path must not be empty"));
        }
        info!(path = %db_path, "Creating GameRepository");
        Ok(Self { db_path })
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    /// Applies any pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    /// Inserts a client, or updates its status and session if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, row), fields(client_id = %row.id(), status = %row.status()))]
    pub fn upsert_client(&self, row: NewClientRow) -> Result<(), DbError> {
        let mut conn = self.connection()?;

        diesel::insert_into(schema::clients::table)
            .values(&row)
            .on_conflict(schema::clients::id)
            .do_update()
            .set((
                schema::clients::status.eq(row.status()),
                schema::clients::session_id.eq(row.session_id()),
            ))
            .execute(&mut conn)?;

        debug!("Client saved");
        Ok(())
    }

    /// Gets a client by ID. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_client(&self, client_id: &str) -> Result<Option<ClientRow>, DbError> {
        let mut conn = self.connection()?;

        let client = schema::clients::table
            .find(client_id)
            .select(ClientRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(client)
    }

    /// Writes the latest snapshot of a session, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, row), fields(session_id = %row.id(), status = %row.status()))]
    pub fn save_session(&self, row: NewSessionRow) -> Result<(), DbError> {
        let mut conn = self.connection()?;

        diesel::replace_into(schema::sessions::table)
            .values(&row)
            .execute(&mut conn)?;

        debug!("Session snapshot saved");
        Ok(())
    }

    /// Gets a session snapshot by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRow>, DbError> {
        let mut conn = self.connection()?;

        let session = schema::sessions::table
            .find(session_id)
            .select(SessionRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(session)
    }

    /// Records a completed game. Each session can be recorded only once.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the session already has a result or a database
    /// error occurs.
    #[instrument(skip(self, row), fields(session_id = %row.session_id(), outcome = %row.outcome()))]
    pub fn record_result(&self, row: NewResultRow) -> Result<ResultRow, DbError> {
        debug!("Recording game result");
        let mut conn = self.connection()?;

        let result = diesel::insert_into(schema::results::table)
            .values(&row)
            .returning(ResultRow::as_returning())
            .get_result(&mut conn)?;

        info!(
            session_id = %result.session_id(),
            witness_model = %result.witness_model(),
            detective_model = %result.detective_model(),
            outcome = %result.outcome(),
            "Game result recorded"
        );
        Ok(result)
    }

    /// Gets the result of one session.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_result(&self, session_id: &str) -> Result<Option<ResultRow>, DbError> {
        let mut conn = self.connection()?;

        let result = schema::results::table
            .find(session_id)
            .select(ResultRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result)
    }

    /// Lists all results, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_results(&self) -> Result<Vec<ResultRow>, DbError> {
        let mut conn = self.connection()?;

        let results = schema::results::table
            .order(schema::results::recorded_at.desc())
            .select(ResultRow::as_select())
            .load(&mut conn)?;

        info!(count = results.len(), "Results loaded");
        Ok(results)
    }

    /// Aggregates a model label's record as Detective and as Witness.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn model_stats(&self, model_name: &str) -> Result<ModelStats, DbError> {
        debug!(model = %model_name, "Computing model stats");
        let mut conn = self.connection()?;

        let results = schema::results::table
            .filter(
                schema::results::witness_model
                    .eq(model_name)
                    .or(schema::results::detective_model.eq(model_name)),
            )
            .select(ResultRow::as_select())
            .load(&mut conn)?;

        let mut detective_games = 0;
        let mut detective_wins = 0;
        let mut witness_games = 0;
        let mut witness_wins = 0;

        for result in &results {
            let detective_won = match result.outcome().as_str() {
                "win" => true,
                "loss" => false,
                other => {
                    warn!(
                        outcome = %other,
                        session_id = %result.session_id(),
                        "Unknown outcome value"
                    );
                    continue;
                }
            };
            if result.detective_model() == model_name {
                detective_games += 1;
                detective_wins += i32::from(detective_won);
            }
            if result.witness_model() == model_name {
                witness_games += 1;
                witness_wins += i32::from(!detective_won);
            }
        }

        let stats = ModelStats::new(
            model_name.to_string(),
            detective_games,
            detective_wins,
            witness_games,
            witness_wins,
        );

        info!(
            model = %model_name,
            total = stats.total_games(),
            detective_win_rate = %format!("{:.1}%", stats.detective_win_rate()),
            witness_win_rate = %format!("{:.1}%", stats.witness_win_rate()),
            "Model stats computed"
        );

        Ok(stats)
    }
}
