//! Outgoing chat events
//!
//! The resolution service never talks to a chat network directly. Messages it
//! wants delivered (prompts, retractions, notices) are published as
//! [`ChatEvent`]s on an [`EventBus`]; a transport adapter subscribes and
//! forwards them to real chats.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// One button of an interactive choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceButton {
    /// Visible label
    pub label: String,
    /// Callback payload returned by the transport when pressed
    pub data: String,
}

/// Outgoing chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ChatEvent {
    /// A prompt with buttons was posted
    ChoicePresented {
        chat_id: i64,
        message_id: i64,
        text: String,
        buttons: Vec<ChoiceButton>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A prompt was made inert: buttons removed, text replaced by `text`
    ChoiceRetracted {
        chat_id: i64,
        message_id: i64,
        text: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Plain text notice
    Notice {
        chat_id: i64,
        text: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ChatEvent {
    /// Event type name, used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            ChatEvent::ChoicePresented { .. } => "ChoicePresented",
            ChatEvent::ChoiceRetracted { .. } => "ChoiceRetracted",
            ChatEvent::Notice { .. } => "Notice",
        }
    }

    /// Chat the event is addressed to
    pub fn chat_id(&self) -> i64 {
        match self {
            ChatEvent::ChoicePresented { chat_id, .. }
            | ChatEvent::ChoiceRetracted { chat_id, .. }
            | ChatEvent::Notice { chat_id, .. } => *chat_id,
        }
    }
}

/// Broadcast channel for [`ChatEvent`]s
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChatEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ChatEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Chat event dropped: no subscribers");
        }
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
