//! Hard to Get game server library.
//!
//! Pairs language-model clients into two-player sessions of Hard to Get and
//! drives each session through its rounds. A Witness knows a secret key word
//! and answers binary dilemmas; a Detective eliminates board words trying to
//! isolate the key word without ever eliminating it.
//!
//! # Architecture
//!
//! - **Engine**: [`GameEngine`] facade over the registry, matchmaker, session
//!   store and round engine
//! - **Transports**: MCP tools ([`GameServer`]) and REST + SSE ([`router`])
//! - **Persistence**: optional SQLite store behind [`ResultRecorder`]
//!
//! # Example
//!
//! ```no_run
//! use hard_to_get::{
//!     Corpus, GameEngine, GameRules, MemoryNotifier, MemoryRecorder, RandomSource, Role,
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), hard_to_get::EngineError> {
//! let engine = GameEngine::new(
//!     Corpus::builtin(),
//!     GameRules::default(),
//!     RandomSource::seeded(7),
//!     Arc::new(MemoryNotifier::new()),
//!     Arc::new(MemoryRecorder::new()),
//! )?;
//! let witness = engine.register("model-a".to_string());
//! let detective = engine.register("model-b".to_string());
//! engine.join(witness.id(), Some(Role::Witness))?;
//! let joined = engine.join(detective.id(), Some(Role::Detective))?;
//! assert!(joined.session_ready);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod client;
mod config;
mod db;
mod engine;
mod error;
mod games;
mod http;
mod matchmaker;
mod notify;
mod random;
mod recorder;
mod server;
mod session;

// Crate-level exports - Engine
pub use engine::{ChoiceReceipt, EliminationReport, GameEngine, SessionView, TurnView};
pub use error::EngineError;
pub use matchmaker::{Assignment, Matchmaker};

// Crate-level exports - Clients and sessions
pub use client::{Client, ClientRegistry, ClientStatus};
pub use session::{ClientId, Session, SessionId, SessionStatus, SessionStore, Turn};

// Crate-level exports - Game rules
pub use games::hard_to_get::{
    BOARD_SIZE, Board, ChoiceAccepted, Corpus, CorpusError, Dilemma, Elimination,
    EliminationApplied, GameRules, MAX_ROUNDS, MoveError, Outcome, Resolution, Role, RoundEngine,
    RoundStarted, Verdict, invariants, judge,
};

// Crate-level exports - Randomness
pub use random::RandomSource;

// Crate-level exports - Notifications
pub use notify::{Audience, BroadcastNotifier, GameEvent, MemoryNotifier, Notification, Notifier};

// Crate-level exports - Recording and persistence
pub use db::{
    ClientRow, DbError, GameRepository, MIGRATIONS, ModelStats, NewClientRow, NewResultRow,
    NewSessionRow, ResultRow, SessionRow,
};
pub use recorder::{DbRecorder, GameResult, MemoryRecorder, ResultRecorder};

// Crate-level exports - Configuration
pub use config::{ConfigError, ServerConfig};

// Crate-level exports - Transports
pub use http::{AppState, ErrorBody, Registered, router};
pub use server::{
    DetectiveEliminationRequest, GameServer, GetSessionRequest, GetTurnRequest, JoinGameRequest,
    RegisterClientRequest, WitnessChoiceRequest,
};
