use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Identifies one live real-time connection for the lifetime of that connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted chat message. `id` and `timestamp` are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    /// Client-declared, not authenticated
    pub user_id: String,
    /// Display name, not unique
    pub username: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// The client-supplied part of a chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    pub user_id: String,
    pub username: String,
    pub message: String,
}

impl NewChatMessage {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            message: message.into(),
        }
    }

    /// Reject empty fields. Required by the HTTP create path; the real-time
    /// path substitutes defaults for the identity fields instead.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.is_empty() {
            return Err(ValidationError::EmptyField("userId"));
        }
        if self.username.is_empty() {
            return Err(ValidationError::EmptyField("username"));
        }
        if self.message.is_empty() {
            return Err(ValidationError::EmptyField("message"));
        }
        Ok(())
    }
}

/// A recorded search request together with its JSON-encoded results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    pub id: Uuid,
    pub query: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// JSON array of results, stored as text
    pub results: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSearchQuery {
    pub query: String,
    pub kind: String,
    pub results: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_uses_camel_case() {
        let msg = ChatMessage {
            id: Uuid::new_v4(),
            user_id: "u-1".into(),
            username: "Taro".into(),
            message: "hello".into(),
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["userId"], "u-1");
        assert_eq!(value["username"], "Taro");
        assert!(value.get("user_id").is_none());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        assert!(NewChatMessage::new("u", "Taro", "hi").validate().is_ok());
        assert_eq!(
            NewChatMessage::new("u", "Taro", "").validate(),
            Err(ValidationError::EmptyField("message"))
        );
        assert_eq!(
            NewChatMessage::new("", "Taro", "hi").validate(),
            Err(ValidationError::EmptyField("userId"))
        );
        assert_eq!(
            NewChatMessage::new("u", "", "hi").validate(),
            Err(ValidationError::EmptyField("username"))
        );
    }

    #[test]
    fn test_validate_accepts_whitespace_content() {
        assert!(NewChatMessage::new(" ", "Taro", "   ").validate().is_ok());
        assert!(NewChatMessage::new("u", " ", " ").validate().is_ok());
    }

    #[test]
    fn test_search_query_kind_serializes_as_type() {
        let q = SearchQuery {
            id: Uuid::new_v4(),
            query: "rust".into(),
            kind: "web".into(),
            results: "[]".into(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "web");
        assert_eq!(value["results"], "[]");
    }
}
