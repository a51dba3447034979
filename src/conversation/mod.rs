//! Conversation state and the business rules around it.
//!
//! - [`ConversationStore`] owns the ordered message log and persists it.
//! - [`ConversationController`] runs submit/retry/export/clear on top of the
//!   store and a [`RetryPolicy`](crate::retry::RetryPolicy).

mod controller;
mod export;
mod message;
mod store;

pub use controller::{ControllerStatus, ConversationController, SubmitOutcome};
pub use export::{
    export_file_name, export_json, export_records, format_relative, write_export, ExportRecord,
};
pub use message::{Message, MessagePatch, NewMessage, Sender};
pub use store::ConversationStore;
