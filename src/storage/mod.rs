//! Durable key-value storage for the conversation.
//!
//! The conversation is persisted as whole values under a few string keys, so
//! the backend only needs `get`/`set`/`remove`. SQLite is the durable backend;
//! the in-memory backend serves tests and the degraded mode used when the
//! database cannot be opened.

mod memory;
mod sqlite;

pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Key holding the JSON-encoded message array.
pub const MESSAGES_KEY: &str = "sentiment-chat.messages";

/// Key holding the conversation title.
pub const TITLE_KEY: &str = "sentiment-chat.title";

/// String key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` when the key has never been written.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Insert or overwrite a value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value if present.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}
