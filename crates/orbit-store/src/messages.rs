//! In-memory [`MessageStore`].

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::Utc;
use orbit_shared::{ChatMessage, NewChatMessage};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::MessageStore;

/// Chat history kept in insertion order.
///
/// Without a retention cap the store grows for the lifetime of the process;
/// reads are windowed but nothing is ever evicted. With `max_retained` set,
/// the oldest records are dropped once the cap is exceeded.
#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    messages: RwLock<VecDeque<ChatMessage>>,
    max_retained: Option<usize>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_retained` messages. `0` means unbounded.
    pub fn with_retention(max_retained: usize) -> Self {
        Self {
            messages: RwLock::new(VecDeque::new()),
            max_retained: (max_retained > 0).then_some(max_retained),
        }
    }

    pub fn max_retained(&self) -> Option<usize> {
        self.max_retained
    }

    /// Number of messages currently retained.
    pub fn len(&self) -> Result<usize> {
        Ok(self
            .messages
            .read()
            .map_err(|_| StoreError::LockPoisoned("messages"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl MessageStore for MemoryMessageStore {
    fn create_message(&self, new: NewChatMessage) -> Result<ChatMessage> {
        let mut messages = self
            .messages
            .write()
            .map_err(|_| StoreError::LockPoisoned("messages"))?;

        // Never go backwards, even if the wall clock does.
        let now = Utc::now();
        let timestamp = match messages.back() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let message = ChatMessage {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            username: new.username,
            message: new.message,
            timestamp,
        };
        messages.push_back(message.clone());

        if let Some(cap) = self.max_retained {
            while messages.len() > cap {
                if let Some(evicted) = messages.pop_front() {
                    debug!(id = %evicted.id, "Evicted message past retention cap");
                }
            }
        }

        Ok(message)
    }

    fn list_messages(&self, limit: usize) -> Result<Vec<ChatMessage>> {
        let messages = self
            .messages
            .read()
            .map_err(|_| StoreError::LockPoisoned("messages"))?;

        let skip = messages.len().saturating_sub(limit);
        Ok(messages.iter().skip(skip).cloned().collect())
    }
}
