/// Application name
pub const APP_NAME: &str = "Orbit Dashboard";

/// Path of the real-time chat endpoint
pub const WS_PATH: &str = "/ws";

/// `userId` assigned to real-time senders that omit one
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// `username` assigned to real-time senders that omit one
pub const ANONYMOUS_USERNAME: &str = "Anonymous";

/// Number of chat messages returned by a history request
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Number of search queries returned by a search history request
pub const DEFAULT_SEARCH_HISTORY_LIMIT: usize = 20;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Maximum accepted request body in bytes (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
