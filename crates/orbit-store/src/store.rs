use orbit_shared::{ChatMessage, NewChatMessage, NewSearchQuery, SearchQuery};

use crate::error::Result;

/// Ordered, append-only chat history.
///
/// Implementations are shared across connection tasks and HTTP handlers, so
/// every method takes `&self` and must be safe to call concurrently: a `list`
/// never observes a half-applied `create`.
pub trait MessageStore: Send + Sync {
    /// Persist a message, assigning a fresh id and the current server time.
    /// Callers validate the input first.
    fn create_message(&self, new: NewChatMessage) -> Result<ChatMessage>;

    /// The `limit` most recent messages, oldest first. `limit == 0` yields
    /// an empty list.
    fn list_messages(&self, limit: usize) -> Result<Vec<ChatMessage>>;
}

/// History of search requests.
pub trait SearchQueryStore: Send + Sync {
    fn create_query(&self, new: NewSearchQuery) -> Result<SearchQuery>;

    /// The `limit` most recent queries, newest first.
    fn list_queries(&self, limit: usize) -> Result<Vec<SearchQuery>>;
}
