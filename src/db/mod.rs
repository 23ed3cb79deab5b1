//! Database persistence for clients, sessions and game results.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::DbError;
pub use models::{
    ClientRow, ModelStats, NewClientRow, NewResultRow, NewSessionRow, ResultRow, SessionRow,
};
pub use repository::{GameRepository, MIGRATIONS};
