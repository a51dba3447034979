use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::export::export_json;
use super::message::{Message, MessagePatch, NewMessage, Sender};
use super::store::ConversationStore;
use crate::classifier::Classifier;
use crate::error::{ConversationError, ConversationResult};
use crate::retry::{RetryPolicy, RetryState};

/// Controller state, as seen by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    /// Ready for input
    Idle,
    /// A submit, retry or clear is in flight; new triggers are rejected.
    Submitting(RetryState),
}

/// Messages produced by one submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    /// The appended user message
    pub user: Message,
    /// The appended reply, classified or failed
    pub bot: Message,
}

impl SubmitOutcome {
    /// Whether the reply carries a classification.
    pub fn succeeded(&self) -> bool {
        !self.bot.is_failed()
    }
}

/// Turns user input into conversation entries.
///
/// Only one submit, retry or clear runs at a time. The store lock is never
/// held across a classification call, so reads and export stay available
/// while a request is in flight.
pub struct ConversationController<C> {
    store: Mutex<ConversationStore>,
    policy: RetryPolicy<C>,
    greeting: String,
    in_flight: AtomicBool,
}

impl<C: Classifier> ConversationController<C> {
    /// Build a controller over a (loaded) store. `greeting` re-seeds on clear.
    pub fn new(store: ConversationStore, policy: RetryPolicy<C>, greeting: impl Into<String>) -> Self {
        Self {
            store: Mutex::new(store),
            policy,
            greeting: greeting.into(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Current state, with retry progress while in flight.
    pub fn status(&self) -> ControllerStatus {
        if self.in_flight.load(Ordering::SeqCst) {
            ControllerStatus::Submitting(self.policy.state())
        } else {
            ControllerStatus::Idle
        }
    }

    /// Shorthand for a `Submitting` status.
    pub fn is_submitting(&self) -> bool {
        matches!(self.status(), ControllerStatus::Submitting(_))
    }

    /// Snapshot of the conversation.
    pub async fn messages(&self) -> Vec<Message> {
        self.store.lock().await.messages().to_vec()
    }

    /// Conversation title.
    pub async fn title(&self) -> String {
        self.store.lock().await.title().to_string()
    }

    /// Rename the conversation; blank titles are rejected.
    pub async fn rename(&self, title: &str) -> ConversationResult<()> {
        self.store.lock().await.set_title(title).await
    }

    /// Append the user's text, classify it and append the bot reply.
    ///
    /// Blank input and a submission while another is in flight are rejected
    /// without touching the conversation. Classification failures are not
    /// errors here: they become a bot message carrying `error`.
    pub async fn submit(&self, raw_text: &str) -> ConversationResult<SubmitOutcome> {
        let text = raw_text.trim();
        if text.is_empty() {
            return Err(ConversationError::validation("text", "cannot be empty"));
        }

        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let user = self.store.lock().await.append(NewMessage::user(text)).await?;
        debug!(id = user.id, "Submitting message for classification");

        let start = Instant::now();
        let reply = match self.policy.with_retry(text).await {
            Ok(classification) => NewMessage::classified(&classification),
            Err(e) => {
                warn!(error = %e, attempts = self.policy.current_attempt(), "Classification failed");
                NewMessage::failed(&e)
            }
        };

        let bot = self.store.lock().await.append(reply).await?;
        info!(
            user_id = user.id,
            bot_id = bot.id,
            failed = bot.is_failed(),
            latency_ms = start.elapsed().as_millis(),
            "Submission completed"
        );

        Ok(SubmitOutcome { user, bot })
    }

    /// Re-classify the user text behind bot message `message_id` and update
    /// that message in place.
    pub async fn retry(&self, message_id: u64) -> ConversationResult<Message> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let text = {
            let store = self.store.lock().await;
            let target = store
                .get(message_id)
                .filter(|m| m.is_bot())
                .ok_or(ConversationError::NotFound { message_id })?;
            let source = store
                .previous(target.id)
                .filter(|m| m.sender == Sender::User)
                .ok_or(ConversationError::NotFound { message_id })?;
            source.text.clone()
        };

        debug!(id = message_id, "Retrying classification");
        let patch = match self.policy.with_retry(&text).await {
            Ok(classification) => MessagePatch::classified(&classification),
            Err(e) => {
                warn!(error = %e, id = message_id, "Retry failed");
                MessagePatch::failed(&e)
            }
        };

        let updated = self.store.lock().await.replace(message_id, patch).await?;
        info!(id = updated.id, failed = updated.is_failed(), "Retry completed");
        Ok(updated)
    }

    /// Serialize the whole conversation; read-only.
    pub async fn export_conversation(&self) -> ConversationResult<String> {
        let store = self.store.lock().await;
        Ok(export_json(store.messages(), Utc::now())?)
    }

    /// Reset to the seed greeting. The caller must have obtained confirmation.
    ///
    /// Rejected with `Busy` while a submit or retry is in flight, so a late
    /// reply never lands in the fresh conversation.
    pub async fn clear_conversation(&self, confirmed: bool) -> ConversationResult<Message> {
        if !confirmed {
            return Err(ConversationError::ConfirmationRequired);
        }
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        self.store
            .lock()
            .await
            .reset(NewMessage::bot(self.greeting.clone()))
            .await
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> ConversationResult<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ConversationError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classification, MockClassifier, Sentiment};
    use crate::error::ServiceError;
    use crate::retry::RetryConfig;
    use crate::storage::MemoryKeyValueStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn controller(mock: MockClassifier) -> ConversationController<MockClassifier> {
        let store = ConversationStore::new(
            Arc::new(MemoryKeyValueStore::new()),
            "Test",
            NewMessage::bot("Hello!"),
        );
        let policy = RetryPolicy::new(
            mock,
            RetryConfig {
                max_attempts: 3,
                backoff_step: Duration::from_millis(1),
            },
        );
        ConversationController::new(store, policy, "Hello!")
    }

    #[tokio::test]
    async fn test_status_idle_after_submit() {
        let mut mock = MockClassifier::new();
        mock.expect_classify()
            .returning(|_| Ok(Classification::new(Sentiment::Neutral, 0.5)));
        let controller = controller(mock);

        assert_eq!(controller.status(), ControllerStatus::Idle);
        controller.submit("hello").await.unwrap();
        assert_eq!(controller.status(), ControllerStatus::Idle);
    }

    #[tokio::test]
    async fn test_submit_trims_text() {
        let mut mock = MockClassifier::new();
        mock.expect_classify()
            .withf(|text: &str| text == "hello")
            .times(1)
            .returning(|_| Ok(Classification::new(Sentiment::Neutral, 0.5)));
        let controller = controller(mock);

        let outcome = controller.submit("  hello \n").await.unwrap();
        assert_eq!(outcome.user.text, "hello");
    }

    #[tokio::test]
    async fn test_retry_on_seed_greeting_is_not_found() {
        let mut mock = MockClassifier::new();
        mock.expect_classify().never();
        let controller = controller(mock);

        let err = controller.retry(1).await.unwrap_err();
        assert!(matches!(err, ConversationError::NotFound { message_id: 1 }));
        assert_eq!(controller.status(), ControllerStatus::Idle);
    }

    #[tokio::test]
    async fn test_retry_on_user_message_is_not_found() {
        let mut mock = MockClassifier::new();
        mock.expect_classify()
            .times(1)
            .returning(|_| Err(ServiceError::from_status(400, "nope")));
        let controller = controller(mock);

        let outcome = controller.submit("hello").await.unwrap();
        let err = controller.retry(outcome.user.id).await.unwrap_err();
        assert!(matches!(err, ConversationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let mut mock = MockClassifier::new();
        mock.expect_classify()
            .returning(|_| Ok(Classification::new(Sentiment::Positive, 0.9)));
        let controller = controller(mock);
        controller.submit("hello").await.unwrap();

        let err = controller.clear_conversation(false).await.unwrap_err();
        assert!(matches!(err, ConversationError::ConfirmationRequired));
        assert_eq!(controller.messages().await.len(), 3);
    }
}
