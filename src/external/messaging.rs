//! Text messaging interface

use super::PlatformError;
use crate::types::ChannelId;
use async_trait::async_trait;
use serde::Serialize;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// A clickable control attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageAction {
    /// Stable identifier the trigger layer routes on
    pub custom_id: String,
    pub label: String,
}

impl MessageAction {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub actions: Vec<MessageAction>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: MessageAction) -> Self {
        self.actions.push(action);
        self
    }
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn post_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<(), PlatformError>;
}
