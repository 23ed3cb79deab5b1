//! REST and server-sent-event interface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, instrument, warn};

use crate::engine::{ChoiceReceipt, EliminationReport, GameEngine, SessionView, TurnView};
use crate::error::EngineError;
use crate::matchmaker::Assignment;
use crate::notify::BroadcastNotifier;
use crate::server::{
    DetectiveEliminationRequest, JoinGameRequest, RegisterClientRequest, WitnessChoiceRequest,
};

/// Shared state behind every route.
#[derive(Debug, Clone)]
pub struct AppState {
    engine: Arc<GameEngine>,
    notifier: Arc<BroadcastNotifier>,
}

impl AppState {
    /// Bundles the engine with the notifier it publishes to.
    pub fn new(engine: Arc<GameEngine>, notifier: Arc<BroadcastNotifier>) -> Self {
        Self { engine, notifier }
    }
}

/// Reply to `POST /register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registered {
    /// Issued client ID.
    pub client_id: String,
}

/// Body of every rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub error: String,
    /// Machine-readable error kind.
    pub kind: String,
}

impl EngineError {
    /// HTTP status for this rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidClient { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidSessionState { .. } | Self::ConcurrencyConflict { .. } => {
                StatusCode::CONFLICT
            }
            Self::InvalidMove(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Corpus(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Builds the router for the REST and SSE endpoints.
#[instrument(skip(state))]
pub fn router(state: AppState) -> Router {
    info!("Building HTTP router");
    Router::new()
        .route("/register", post(register))
        .route("/join_game", post(join_game))
        .route("/witness_choice", post(witness_choice))
        .route("/detective_choice", post(detective_choice))
        .route("/sessions/{session_id}", get(session))
        .route("/sessions/{session_id}/turn/{client_id}", get(turn))
        .route("/events/{client_id}", get(events))
        .with_state(state)
}

#[instrument(skip(state, req), fields(model_name = %req.model_name))]
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterClientRequest>,
) -> Json<Registered> {
    let client = state.engine.register(req.model_name);
    Json(Registered {
        client_id: client.id().clone(),
    })
}

#[instrument(skip(state, req), fields(client_id = %req.client_id))]
async fn join_game(
    State(state): State<AppState>,
    Json(req): Json<JoinGameRequest>,
) -> Result<Json<Assignment>, EngineError> {
    Ok(Json(state.engine.join(&req.client_id, req.preferred_role)?))
}

#[instrument(skip(state, req), fields(session_id = %req.session_id, client_id = %req.client_id))]
async fn witness_choice(
    State(state): State<AppState>,
    Json(req): Json<WitnessChoiceRequest>,
) -> Result<Json<ChoiceReceipt>, EngineError> {
    Ok(Json(state.engine.submit_witness_choice(
        &req.session_id,
        &req.client_id,
        &req.choice,
    )?))
}

#[instrument(skip(state, req), fields(session_id = %req.session_id, client_id = %req.client_id))]
async fn detective_choice(
    State(state): State<AppState>,
    Json(req): Json<DetectiveEliminationRequest>,
) -> Result<Json<EliminationReport>, EngineError> {
    Ok(Json(state.engine.submit_detective_elimination(
        &req.session_id,
        &req.client_id,
        &req.eliminated_words,
    )?))
}

#[instrument(skip(state))]
async fn session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, EngineError> {
    Ok(Json(state.engine.session(&session_id)?))
}

#[instrument(skip(state))]
async fn turn(
    State(state): State<AppState>,
    Path((session_id, client_id)): Path<(String, String)>,
) -> Result<Json<TurnView>, EngineError> {
    Ok(Json(state.engine.turn(&session_id, &client_id)?))
}

/// Streams every notification addressed to `client_id`.
#[instrument(skip(state))]
async fn events(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, EngineError> {
    if state.engine.client(&client_id).is_none() {
        return Err(EngineError::invalid_client(client_id, "not registered"));
    }
    info!(client_id = %client_id, "Event stream opened");
    let rx = state.notifier.subscribe();

    let stream = futures::stream::unfold((rx, client_id), |(mut rx, client_id)| async move {
        loop {
            match rx.recv().await {
                Ok(notification) if notification.is_addressed_to(&client_id) => {
                    let name = notification.event.name();
                    match Event::default().event(name).json_data(&notification.event) {
                        Ok(event) => {
                            debug!(client_id = %client_id, event = name, "Event pushed");
                            return Some((Ok(event), (rx, client_id)));
                        }
                        Err(e) => warn!(error = %e, event = name, "Failed to encode event"),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(client_id = %client_id, skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => {
                    info!(client_id = %client_id, "Event stream closed");
                    return None;
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
