//! # Sentiment Chat
//!
//! A single-user conversation client for an external sentiment-classification
//! service. Each submitted text is stored as a user message, classified with
//! bounded automatic retry, and answered with a bot message carrying the
//! sentiment and confidence, or the error that prevented classification.
//!
//! ## Architecture
//!
//! ```text
//! CLI / REPL → ConversationController → RetryPolicy → SentimentClient (HTTP)
//!                      ↓
//!              ConversationStore → KeyValueStore (SQLite)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sentiment_chat::{Config, ConversationController, ConversationStore, NewMessage};
//! use sentiment_chat::classifier::SentimentClient;
//! use sentiment_chat::retry::{RetryConfig, RetryPolicy};
//! use sentiment_chat::storage::SqliteKeyValueStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let backend = Arc::new(SqliteKeyValueStore::new(&config.database).await?);
//!     let greeting = config.conversation.greeting.clone();
//!     let mut store = ConversationStore::new(backend, &config.conversation.title, NewMessage::bot(&greeting));
//!     store.load().await;
//!
//!     let client = SentimentClient::new(&config.service, &config.request)?;
//!     let policy = RetryPolicy::new(client, RetryConfig::from(&config.request));
//!     let controller = ConversationController::new(store, policy, greeting);
//!
//!     let outcome = controller.submit("I love this!").await?;
//!     println!("{}", outcome.bot.text);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Sentiment service client and response types.
pub mod classifier;
/// Command-line arguments, REPL commands and rendering.
pub mod cli;
/// Configuration loaded from the environment.
pub mod config;
/// Conversation store, controller and export.
pub mod conversation;
/// Error types and result aliases for the application.
pub mod error;
/// Bounded retry around the classifier.
pub mod retry;
/// Durable key-value storage backends.
pub mod storage;

pub use config::Config;
pub use conversation::{ConversationController, ConversationStore, Message, NewMessage};
pub use error::{AppError, AppResult};
