//! Outbound game events.
//!
//! The engine only declares who an event is for; delivery belongs to a
//! [`Notifier`]. Notifying never blocks and never fails from the engine's
//! point of view.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

use crate::games::hard_to_get::Dilemma;
use crate::session::{ClientId, SessionId, lock};

/// Who should receive an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", rename_all = "snake_case")]
pub enum Audience {
    /// One client.
    Client {
        /// Recipient.
        client_id: ClientId,
    },
    /// Every participant of a session.
    Session {
        /// The session.
        session_id: SessionId,
        /// Its participants at the time of the event.
        participants: Vec<ClientId>,
    },
}

impl Audience {
    /// Whether `client_id` is in this audience.
    pub fn includes(&self, client_id: &str) -> bool {
        match self {
            Audience::Client { client_id: to } => to == client_id,
            Audience::Session { participants, .. } => participants.iter().any(|p| p == client_id),
        }
    }
}

/// An event pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// Both roles are filled and round 1 has begun.
    SessionStarted {
        /// The session.
        session_id: SessionId,
    },
    /// The Witness must answer a dilemma.
    WitnessTurn {
        /// The session.
        session_id: SessionId,
        /// The secret word.
        key_word: String,
        /// The dilemma to answer.
        dilemma: Dilemma,
        /// Current round.
        round: u8,
    },
    /// The Detective must eliminate words.
    DetectiveTurn {
        /// The session.
        session_id: SessionId,
        /// Current round.
        round: u8,
        /// The dilemma the Witness answered.
        dilemma: Dilemma,
        /// The side the Witness chose.
        witness_choice: String,
    },
    /// The game is over.
    SessionEnded {
        /// The session.
        session_id: SessionId,
        /// Whether the Detective won.
        win: bool,
        /// The secret word.
        key_word: String,
        /// The board at the end.
        final_board: Vec<String>,
    },
}

impl GameEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::SessionStarted { .. } => "session_started",
            GameEvent::WitnessTurn { .. } => "witness_turn",
            GameEvent::DetectiveTurn { .. } => "detective_turn",
            GameEvent::SessionEnded { .. } => "session_ended",
        }
    }
}

/// An addressed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Recipients.
    pub audience: Audience,
    /// Payload.
    pub event: GameEvent,
}

impl Notification {
    /// Event for a single client.
    pub fn to_client(client_id: impl Into<ClientId>, event: GameEvent) -> Self {
        Self {
            audience: Audience::Client {
                client_id: client_id.into(),
            },
            event,
        }
    }

    /// Event for all participants of a session.
    pub fn to_session(
        session_id: impl Into<SessionId>,
        participants: Vec<ClientId>,
        event: GameEvent,
    ) -> Self {
        Self {
            audience: Audience::Session {
                session_id: session_id.into(),
                participants,
            },
            event,
        }
    }

    /// Whether `client_id` should receive this notification.
    pub fn is_addressed_to(&self, client_id: &str) -> bool {
        self.audience.includes(client_id)
    }
}

/// Delivers notifications. Fire-and-forget.
pub trait Notifier: Send + Sync {
    /// Hands `notification` off for delivery.
    fn notify(&self, notification: Notification);
}

/// Fans notifications out over a tokio broadcast channel.
///
/// Subscribers filter by [`Notification::is_addressed_to`]. Sending with no
/// subscribers drops the event.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    /// Creates a notifier buffering up to `capacity` events per subscriber.
    #[instrument]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribes to every future notification.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        let event = notification.event.name();
        match self.tx.send(notification) {
            Ok(receivers) => debug!(event, receivers, "Notification sent"),
            Err(_) => trace!(event, "Notification dropped, no subscribers"),
        }
    }
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<Notification> {
        lock(&self.sent).clone()
    }

    /// Events addressed to `client_id`, in order.
    pub fn events_for(&self, client_id: &str) -> Vec<GameEvent> {
        lock(&self.sent)
            .iter()
            .filter(|n| n.is_addressed_to(client_id))
            .map(|n| n.event.clone())
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.sent).push(notification);
    }
}
