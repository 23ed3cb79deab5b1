//! Client registry.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::EngineError;
use crate::session::{ClientId, SessionId, lock};

/// Availability of a client.
///
/// Moves only forward: `Available → Searching → InSession`. A client that
/// has finished a session registers again to play another.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClientStatus {
    /// Registered, never joined.
    Available,
    /// Inside a join attempt that has not completed.
    Searching,
    /// Assigned to a session.
    InSession,
}

/// A registered client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Client {
    /// Opaque identifier issued at registration.
    id: ClientId,
    /// Free-form model label.
    model_name: String,
    /// Current availability.
    status: ClientStatus,
    /// Session assigned on join.
    session_id: Option<SessionId>,
}

/// Thread-safe table of registered clients.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, Client>>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new client and returns it.
    #[instrument(skip(self))]
    pub fn register(&self, model_name: String) -> Client {
        let client = Client {
            id: uuid::Uuid::new_v4().to_string(),
            model_name,
            status: ClientStatus::Available,
            session_id: None,
        };
        lock(&self.clients).insert(client.id.clone(), client.clone());
        info!(client_id = %client.id, model = %client.model_name, "Client registered");
        client
    }

    /// Looks up a client.
    #[instrument(skip(self))]
    pub fn get(&self, client_id: &str) -> Option<Client> {
        let client = lock(&self.clients).get(client_id).cloned();
        if client.is_none() {
            debug!(client_id, "Client not found");
        }
        client
    }

    /// Marks a client as searching.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidClient`] if the client is unknown or already
    /// in a session.
    #[instrument(skip(self))]
    pub fn begin_search(&self, client_id: &str) -> Result<Client, EngineError> {
        let mut clients = lock(&self.clients);
        let client = clients.get_mut(client_id).ok_or_else(|| {
            warn!(client_id, "Join from unknown client");
            EngineError::invalid_client(client_id, "not registered")
        })?;

        if client.status == ClientStatus::InSession {
            warn!(client_id, session_id = ?client.session_id, "Client already in a session");
            return Err(EngineError::invalid_client(client_id, "already in a session"));
        }

        client.status = ClientStatus::Searching;
        debug!(client_id, "Client searching");
        Ok(client.clone())
    }

    /// Records a successful assignment.
    #[instrument(skip(self))]
    pub fn assign(&self, client_id: &str, session_id: &str) -> Result<Client, EngineError> {
        let mut clients = lock(&self.clients);
        let client = clients
            .get_mut(client_id)
            .ok_or_else(|| EngineError::invalid_client(client_id, "not registered"))?;

        if client.status != ClientStatus::Searching {
            return Err(EngineError::invalid_client(
                client_id,
                format!("cannot assign a client that is {}", client.status),
            ));
        }

        client.status = ClientStatus::InSession;
        client.session_id = Some(session_id.to_string());
        info!(client_id, session_id, "Client assigned");
        Ok(client.clone())
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        lock(&self.clients).len()
    }

    /// True when no client has registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
