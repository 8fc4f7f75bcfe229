//! # orbit-store
//!
//! Process-memory storage for the Orbit dashboard.
//!
//! The server talks to storage only through the [`MessageStore`] and
//! [`SearchQueryStore`] traits, so a durable backend can replace the
//! in-memory implementations without touching the HTTP façade or the
//! real-time gateway. The in-memory stores own their collections outright
//! and hand callers clones, never references into the backing storage.

pub mod messages;
pub mod searches;
pub mod store;

mod error;

pub use error::{Result, StoreError};
pub use messages::MemoryMessageStore;
pub use searches::MemorySearchStore;
pub use store::{MessageStore, SearchQueryStore};
