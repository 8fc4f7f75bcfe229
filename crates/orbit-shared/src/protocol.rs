use serde::{Deserialize, Serialize};

use crate::constants::{ANONYMOUS_USERNAME, ANONYMOUS_USER_ID};
use crate::error::ProtocolError;
use crate::types::{ChatMessage, NewChatMessage};

/// Frames a client may send over the real-time channel, discriminated by
/// their `type` field.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundFrame {
    /// `{ "type": "chat", "userId"?, "username"?, "message" }`
    Chat(ChatFrame),

    /// Any other `type` value. Ignored by the gateway.
    #[serde(other)]
    Unknown,
}

/// Body of an inbound chat frame. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatFrame {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub message: Option<String>,
}

impl ChatFrame {
    /// Normalize into a storable message. Missing or empty identity fields
    /// fall back to the anonymous sentinels; a missing or empty body yields
    /// `None`.
    pub fn into_new_message(self) -> Option<NewChatMessage> {
        let message = self.message.filter(|m| !m.is_empty())?;
        let user_id = self
            .user_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER_ID.to_string());
        let username = self
            .username
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ANONYMOUS_USERNAME.to_string());

        Some(NewChatMessage {
            user_id,
            username,
            message,
        })
    }
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Binary frames carry the same JSON as text frames.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(data)?;
        Self::parse(text)
    }
}

/// Frames the server pushes to every open channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum OutboundEnvelope {
    /// `{ "type": "chat", "data": ChatMessage }`
    Chat(ChatMessage),
}

impl OutboundEnvelope {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
