use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::message::{Message, MessagePatch, NewMessage};
use crate::error::{ConversationError, ConversationResult};
use crate::storage::{KeyValueStore, MESSAGES_KEY, TITLE_KEY};

/// Owns the ordered message log and writes it through to durable storage.
///
/// Every mutation (append, replace, reset, rename) persists the full message
/// list and the title before returning. A failed write is logged and the in-memory log stays
/// authoritative for the session.
pub struct ConversationStore {
    backend: Arc<dyn KeyValueStore>,
    title: String,
    messages: Vec<Message>,
    next_id: u64,
}

impl ConversationStore {
    /// Create a store seeded with `seed` (id 1). Nothing is written yet.
    pub fn new(backend: Arc<dyn KeyValueStore>, title: impl Into<String>, seed: NewMessage) -> Self {
        let mut store = Self {
            backend,
            title: title.into(),
            messages: Vec::new(),
            next_id: 1,
        };
        store.seed(seed);
        store
    }

    /// Restore the persisted conversation, if any.
    ///
    /// Missing, unreadable or malformed data leaves the seeded state in place.
    /// Returns whether persisted messages were restored.
    pub async fn load(&mut self) -> bool {
        match self.backend.get(TITLE_KEY).await {
            Ok(Some(title)) if !title.trim().is_empty() => self.title = title,
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to read conversation title"),
        }

        let raw = match self.backend.get(MESSAGES_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted conversation, starting from seed");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Conversation storage unavailable, starting from seed");
                return false;
            }
        };

        match decode_messages(&raw) {
            Some(messages) => {
                self.next_id = messages.last().map(|m| m.id + 1).unwrap_or(1);
                info!(messages = messages.len(), "Restored persisted conversation");
                self.messages = messages;
                true
            }
            None => {
                warn!("Persisted conversation is malformed, starting from seed");
                false
            }
        }
    }

    /// Conversation title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// All messages in id order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages, including the seed.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false once seeded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Look up a message by id.
    pub fn get(&self, id: u64) -> Option<&Message> {
        self.position(id).map(|i| &self.messages[i])
    }

    /// The message immediately before `id` in the log.
    pub fn previous(&self, id: u64) -> Option<&Message> {
        match self.position(id) {
            Some(i) if i > 0 => self.messages.get(i - 1),
            _ => None,
        }
    }

    /// Insert at the tail with the next id and persist.
    pub async fn append(&mut self, draft: NewMessage) -> ConversationResult<Message> {
        draft.validate()?;

        let message = Message {
            id: self.next_id,
            text: draft.text,
            sender: draft.sender,
            timestamp: Utc::now(),
            sentiment: draft.sentiment,
            confidence: draft.confidence,
            error: draft.error,
        };
        self.next_id += 1;
        self.messages.push(message.clone());

        debug!(id = message.id, sender = %message.sender, "Appended message");
        self.persist().await;
        Ok(message)
    }

    /// Merge `patch` into the message with `id`, keeping its id and position.
    pub async fn replace(&mut self, id: u64, patch: MessagePatch) -> ConversationResult<Message> {
        let index = self
            .position(id)
            .ok_or(ConversationError::NotFound { message_id: id })?;

        let updated = patch.applied_to(&self.messages[index]);
        updated.check_invariants()?;
        self.messages[index] = updated.clone();

        debug!(id, "Replaced message in place");
        self.persist().await;
        Ok(updated)
    }

    /// Discard every message and re-seed with `seed` as id 1, then persist.
    pub async fn reset(&mut self, seed: NewMessage) -> ConversationResult<Message> {
        seed.validate()?;
        let message = self.seed(seed);

        info!("Conversation reset");
        self.persist().await;
        Ok(message)
    }

    /// Rename the conversation and persist it.
    pub async fn set_title(&mut self, title: &str) -> ConversationResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ConversationError::validation("title", "cannot be empty"));
        }
        self.title = title.to_string();

        self.persist().await;
        Ok(())
    }

    fn seed(&mut self, seed: NewMessage) -> Message {
        let message = Message {
            id: 1,
            text: seed.text,
            sender: seed.sender,
            timestamp: Utc::now(),
            sentiment: seed.sentiment,
            confidence: seed.confidence,
            error: seed.error,
        };
        self.messages = vec![message.clone()];
        self.next_id = 2;
        message
    }

    fn position(&self, id: u64) -> Option<usize> {
        // ids are strictly increasing
        self.messages.binary_search_by_key(&id, |m| m.id).ok()
    }

    async fn persist(&self) {
        let encoded = match serde_json::to_string(&self.messages) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "Failed to encode conversation");
                return;
            }
        };

        if let Err(e) = self.backend.set(MESSAGES_KEY, &encoded).await {
            warn!(error = %e, "Failed to persist conversation");
        }
        if let Err(e) = self.backend.set(TITLE_KEY, &self.title).await {
            warn!(error = %e, "Failed to persist conversation title");
        }
    }
}

fn decode_messages(raw: &str) -> Option<Vec<Message>> {
    let messages: Vec<Message> = serde_json::from_str(raw).ok()?;

    let ordered = messages.windows(2).all(|pair| pair[0].id < pair[1].id);
    let valid = messages.iter().all(|m| m.check_invariants().is_ok());

    (!messages.is_empty() && ordered && valid).then_some(messages)
}
