//! Outgoing message surface
//!
//! The resolution service posts prompts, retracts them, and sends notices
//! through [`ChatSurface`]. [`EventBusSurface`] publishes them as
//! [`ChatEvent`]s for the SSE stream.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cinelist_common::events::{ChatEvent, EventBus};
use cinelist_common::time;

use crate::models::ChoicePrompt;

/// Delivery side of the chat transport
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Post a prompt with buttons; returns the new message id
    async fn present_choice(&self, chat_id: i64, prompt: &ChoicePrompt)
        -> cinelist_common::Result<i64>;

    /// Remove the buttons of a posted prompt and replace its text
    async fn retract_choice(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> cinelist_common::Result<()>;

    /// Send a plain notice
    async fn notify(&self, chat_id: i64, text: &str) -> cinelist_common::Result<()>;
}

/// [`ChatSurface`] that publishes to an [`EventBus`]
///
/// Message ids are allocated locally and increase monotonically.
#[derive(Debug, Clone)]
pub struct EventBusSurface {
    bus: EventBus,
    next_message_id: Arc<AtomicI64>,
}

impl EventBusSurface {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            next_message_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

#[async_trait]
impl ChatSurface for EventBusSurface {
    async fn present_choice(
        &self,
        chat_id: i64,
        prompt: &ChoicePrompt,
    ) -> cinelist_common::Result<i64> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        self.bus.emit_lossy(ChatEvent::ChoicePresented {
            chat_id,
            message_id,
            text: prompt.text.clone(),
            buttons: prompt.buttons.clone(),
            timestamp: time::now(),
        });
        Ok(message_id)
    }

    async fn retract_choice(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> cinelist_common::Result<()> {
        self.bus.emit_lossy(ChatEvent::ChoiceRetracted {
            chat_id,
            message_id,
            text: text.to_string(),
            timestamp: time::now(),
        });
        Ok(())
    }

    async fn notify(&self, chat_id: i64, text: &str) -> cinelist_common::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.bus.emit_lossy(ChatEvent::Notice {
            chat_id,
            text: text.to_string(),
            timestamp: time::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PromptKind;

    #[tokio::test]
    async fn test_prompts_get_increasing_ids_and_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let surface = EventBusSurface::new(bus);
        let prompt = ChoicePrompt {
            kind: PromptKind::SimilarTitles,
            text: "Pick one".to_string(),
            options: Vec::new(),
            buttons: Vec::new(),
        };

        let first = surface.present_choice(5, &prompt).await.unwrap();
        let second = surface.present_choice(5, &prompt).await.unwrap();
        assert!(second > first);

        surface.retract_choice(5, first, "Cancelled.").await.unwrap();
        surface.notify(5, "").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().event_type(), "ChoicePresented");
        assert_eq!(rx.recv().await.unwrap().event_type(), "ChoicePresented");
        match rx.recv().await.unwrap() {
            ChatEvent::ChoiceRetracted { message_id, text, .. } => {
                assert_eq!(message_id, first);
                assert_eq!(text, "Cancelled.");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
