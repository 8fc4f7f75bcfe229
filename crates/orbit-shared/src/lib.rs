//! # orbit-shared
//!
//! Types shared by the Orbit dashboard store and server: the chat message
//! record, search history records, the real-time wire protocol and the
//! validation rules applied at the HTTP and WebSocket boundaries.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::{ProtocolError, ValidationError};
pub use protocol::{ChatFrame, InboundFrame, OutboundEnvelope};
pub use types::{ChannelId, ChatMessage, NewChatMessage, NewSearchQuery, SearchQuery};
