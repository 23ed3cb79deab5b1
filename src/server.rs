//! MCP server exposing the engine as tools.

use crate::engine::GameEngine;
use crate::error::EngineError;
use crate::games::hard_to_get::Role;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Request for registering a client.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RegisterClientRequest {
    /// Free-form label of the model playing; `"unknown"` when omitted.
    #[serde(default = "unknown_model")]
    pub model_name: String,
}

fn unknown_model() -> String {
    "unknown".to_string()
}

/// Request for joining a game.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JoinGameRequest {
    /// ID returned by `register_client`.
    pub client_id: String,
    /// Role to ask for; omit to take whatever is open.
    #[serde(default)]
    pub preferred_role: Option<Role>,
}

/// Request for submitting the Witness's choice.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WitnessChoiceRequest {
    /// Session ID.
    pub session_id: String,
    /// Witness client ID.
    pub client_id: String,
    /// One of the two terms of the current dilemma.
    pub choice: String,
}

/// Request for submitting the Detective's elimination.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectiveEliminationRequest {
    /// Session ID.
    pub session_id: String,
    /// Detective client ID.
    pub client_id: String,
    /// Board words to remove.
    pub eliminated_words: Vec<String>,
}

/// Request for a participant's turn view.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetTurnRequest {
    /// Session ID.
    pub session_id: String,
    /// Participant asking.
    pub client_id: String,
}

/// Request for a session snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetSessionRequest {
    /// Session ID.
    pub session_id: String,
}

/// Main server handler.
pub struct GameServer {
    engine: Arc<GameEngine>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for GameServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameServer")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

fn rejected(e: EngineError) -> McpError {
    warn!(kind = e.kind(), error = %e, "Tool call rejected");
    McpError::invalid_params(e.to_string(), Some(serde_json::json!({ "kind": e.kind() })))
}

fn json_result(value: &impl Serialize) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Failed to encode result: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_router]
impl GameServer {
    /// Creates a game server over a shared engine.
    #[instrument(skip(engine))]
    pub fn new(engine: Arc<GameEngine>) -> Self {
        info!("Creating game server");
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }

    /// Registers a client.
    #[instrument(skip(self, req), fields(model_name = %req.model_name))]
    #[tool(description = "Register as a Hard to Get player. Returns your client_id.")]
    pub async fn register_client(
        &self,
        Parameters(req): Parameters<RegisterClientRequest>,
    ) -> Result<CallToolResult, McpError> {
        let client = self.engine.register(req.model_name);
        info!(client_id = %client.id(), "Client registered via MCP");
        json_result(&serde_json::json!({ "client_id": client.id() }))
    }

    /// Joins or creates a session.
    #[instrument(
        skip(self, req),
        fields(client_id = %req.client_id, preferred_role = ?req.preferred_role)
    )]
    #[tool(
        description = "Join a game as 'Witness' or 'Detective' (or either). Returns the session id, your role and the board. When session_ready is true, round 1 has started."
    )]
    pub async fn join_game(
        &self,
        Parameters(req): Parameters<JoinGameRequest>,
    ) -> Result<CallToolResult, McpError> {
        let assignment = self
            .engine
            .join(&req.client_id, req.preferred_role)
            .map_err(rejected)?;
        json_result(&assignment)
    }

    /// Witness picks a side of the dilemma.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, client_id = %req.client_id))]
    #[tool(description = "As the Witness, choose one of the two terms of the current dilemma.")]
    pub async fn submit_witness_choice(
        &self,
        Parameters(req): Parameters<WitnessChoiceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let receipt = self
            .engine
            .submit_witness_choice(&req.session_id, &req.client_id, &req.choice)
            .map_err(rejected)?;
        json_result(&receipt)
    }

    /// Detective removes words from the board.
    #[instrument(
        skip(self, req),
        fields(
            session_id = %req.session_id,
            client_id = %req.client_id,
            count = req.eliminated_words.len()
        )
    )]
    #[tool(
        description = "As the Detective, eliminate one or more words from the board. Eliminating the key word loses the game."
    )]
    pub async fn submit_detective_elimination(
        &self,
        Parameters(req): Parameters<DetectiveEliminationRequest>,
    ) -> Result<CallToolResult, McpError> {
        let report = self
            .engine
            .submit_detective_elimination(&req.session_id, &req.client_id, &req.eliminated_words)
            .map_err(rejected)?;
        json_result(&report)
    }

    /// What the caller should do now.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, client_id = %req.client_id))]
    #[tool(
        description = "Get your current turn: what to answer as Witness, what to eliminate as Detective, or the final result."
    )]
    pub async fn get_turn(
        &self,
        Parameters(req): Parameters<GetTurnRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Getting turn view");
        let view = self
            .engine
            .turn(&req.session_id, &req.client_id)
            .map_err(rejected)?;
        json_result(&view)
    }

    /// Public session snapshot.
    #[instrument(skip(self, req), fields(session_id = %req.session_id))]
    #[tool(
        description = "Get the public state of a session. The key word is revealed only after the game ends."
    )]
    pub async fn get_session(
        &self,
        Parameters(req): Parameters<GetSessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let view = self.engine.session(&req.session_id).map_err(rejected)?;
        json_result(&view)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for GameServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build()).with_instructions(
            "Hard to Get: the Witness knows a key word and answers dilemmas; \
             the Detective eliminates words without eliminating the key word.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::hard_to_get::{Corpus, GameRules};
    use crate::notify::MemoryNotifier;
    use crate::random::RandomSource;
    use crate::recorder::MemoryRecorder;

    fn server() -> GameServer {
        let engine = GameEngine::new(
            Corpus::builtin(),
            GameRules::default(),
            RandomSource::seeded(4),
            Arc::new(MemoryNotifier::new()),
            Arc::new(MemoryRecorder::new()),
        )
        .unwrap();
        GameServer::new(Arc::new(engine))
    }

    #[test]
    fn test_join_request_role_is_optional() {
        let req: JoinGameRequest = serde_json::from_str(r#"{"client_id":"c"}"#).unwrap();
        assert_eq!(req.preferred_role, None);
        let req: JoinGameRequest =
            serde_json::from_str(r#"{"client_id":"c","preferred_role":"witness"}"#).unwrap();
        assert_eq!(req.preferred_role, Some(Role::Witness));
    }

    #[test]
    fn test_register_request_defaults_model_name() {
        let req: RegisterClientRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.model_name, "unknown");
    }

    #[tokio::test]
    async fn test_join_unknown_client_is_invalid_params() {
        let server = server();
        let result = server
            .join_game(Parameters(JoinGameRequest {
                client_id: "ghost".into(),
                preferred_role: None,
            }))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_register_then_join() {
        let server = server();
        let registered = server
            .register_client(Parameters(RegisterClientRequest {
                model_name: "m".into(),
            }))
            .await;
        assert!(registered.is_ok());
        assert_eq!(server.engine.rules().board_size, 16);
    }
}
