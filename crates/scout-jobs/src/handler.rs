//! Turn handlers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use scout_core::ConversationKey;

/// One inbound chat message awaiting processing.
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Time-ordered id for log correlation.
    pub turn_id: Uuid,
    pub key: ConversationKey,
    pub sender_id: String,
    pub room_id: Option<String>,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

impl TurnContext {
    /// Create a turn for a sender, keyed by room when the message came from one.
    pub fn new(sender_id: impl Into<String>, room_id: Option<&str>, content: impl Into<String>) -> Self {
        let sender_id = sender_id.into();
        let room_id = room_id.filter(|r| !r.is_empty()).map(str::to_string);
        Self {
            turn_id: Uuid::now_v7(),
            key: ConversationKey::from_parts(&sender_id, room_id.as_deref()),
            sender_id,
            room_id,
            content: content.into(),
            received_at: Utc::now(),
        }
    }

    /// Recipients of replies: the room if any, else the sender.
    pub fn reply_to(&self) -> Vec<String> {
        vec![self.room_id.clone().unwrap_or_else(|| self.sender_id.clone())]
    }
}

/// Result of handling a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The turn was processed and answered.
    Handled,
    /// The turn was deliberately not processed.
    Ignored(String),
    /// The turn could not be processed.
    Failed(String),
}

/// Trait for turn handlers.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    /// Handle one turn. Turns for the same conversation never overlap.
    async fn handle(&self, ctx: TurnContext) -> TurnOutcome;
}

/// No-op handler for testing.
#[derive(Debug, Default)]
pub struct NoOpHandler;

#[async_trait]
impl TurnHandler for NoOpHandler {
    async fn handle(&self, _ctx: TurnContext) -> TurnOutcome {
        TurnOutcome::Handled
    }
}
