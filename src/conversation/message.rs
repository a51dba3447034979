use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{format_confidence, Classification, Sentiment};
use crate::error::{ConversationError, ConversationResult, ServiceError};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Typed by the person at the keyboard
    User,
    /// Greeting or classification reply
    Bot,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Bot => write!(f, "bot"),
        }
    }
}

/// A stored conversation message.
///
/// User messages never carry a sentiment or confidence. A bot message with
/// `error` set carries neither; it is not a classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Strictly increasing within a conversation.
    pub id: u64,
    /// Displayed body
    pub text: String,
    /// Author of the message
    pub sender: Sender,
    /// Creation time, refreshed when a retry rewrites the message
    pub timestamp: DateTime<Utc>,
    /// Label, only present on successful classifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    /// Confidence score (0.0-1.0), only present on successful classifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Failure detail for a bot reply whose classification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Message {
    /// Whether the bot wrote this message.
    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }

    /// Whether this is a failed classification reply.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Label to show; failed and unclassified messages display as neutral.
    pub fn display_sentiment(&self) -> Sentiment {
        match (&self.error, self.sentiment) {
            (None, Some(sentiment)) => sentiment,
            _ => Sentiment::Neutral,
        }
    }

    /// Formatted confidence, only for successful classifications.
    pub fn display_confidence(&self) -> Option<String> {
        if self.error.is_some() {
            return None;
        }
        self.confidence.map(format_confidence)
    }

    pub(crate) fn check_invariants(&self) -> ConversationResult<()> {
        check_content(
            self.sender,
            self.sentiment,
            self.confidence,
            self.error.as_deref(),
        )
    }
}

/// Message content before the store assigns an id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    /// Displayed body
    pub text: String,
    /// Author
    pub sender: Sender,
    /// Label of a successful classification
    pub sentiment: Option<Sentiment>,
    /// Score of a successful classification
    pub confidence: Option<f64>,
    /// Failure detail
    pub error: Option<String>,
}

impl NewMessage {
    /// Message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            sentiment: None,
            confidence: None,
            error: None,
        }
    }

    /// Plain bot message, e.g. the seed greeting.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            ..Self::user(text)
        }
    }

    /// Bot reply for a successful classification.
    pub fn classified(classification: &Classification) -> Self {
        Self {
            sentiment: Some(classification.sentiment),
            confidence: Some(classification.confidence),
            ..Self::bot(classification.summary())
        }
    }

    /// Bot reply for a failed classification.
    pub fn failed(err: &ServiceError) -> Self {
        let detail = err.detail();
        Self {
            error: Some(detail.clone()),
            ..Self::bot(failure_text(&detail))
        }
    }

    pub(crate) fn validate(&self) -> ConversationResult<()> {
        check_content(
            self.sender,
            self.sentiment,
            self.confidence,
            self.error.as_deref(),
        )
    }
}

/// Partial update applied in place by `ConversationStore::replace`.
///
/// `None` leaves a field untouched; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    /// New body
    pub text: Option<String>,
    /// New label, or cleared
    pub sentiment: Option<Option<Sentiment>>,
    /// New score, or cleared
    pub confidence: Option<Option<f64>>,
    /// New failure detail, or cleared
    pub error: Option<Option<String>>,
    /// New timestamp
    pub timestamp: Option<DateTime<Utc>>,
}

impl MessagePatch {
    /// Replace a bot reply with a fresh successful classification.
    pub fn classified(classification: &Classification) -> Self {
        Self {
            text: Some(classification.summary()),
            sentiment: Some(Some(classification.sentiment)),
            confidence: Some(Some(classification.confidence)),
            error: Some(None),
            timestamp: Some(Utc::now()),
        }
    }

    /// Replace a bot reply with a fresh failure.
    pub fn failed(err: &ServiceError) -> Self {
        let detail = err.detail();
        Self {
            text: Some(failure_text(&detail)),
            sentiment: Some(None),
            confidence: Some(None),
            error: Some(Some(detail)),
            timestamp: Some(Utc::now()),
        }
    }

    /// Apply onto a copy of `message`; id and sender never change.
    pub(crate) fn applied_to(&self, message: &Message) -> Message {
        let mut updated = message.clone();
        if let Some(text) = &self.text {
            updated.text = text.clone();
        }
        if let Some(sentiment) = self.sentiment {
            updated.sentiment = sentiment;
        }
        if let Some(confidence) = self.confidence {
            updated.confidence = confidence;
        }
        if let Some(error) = &self.error {
            updated.error = error.clone();
        }
        if let Some(timestamp) = self.timestamp {
            updated.timestamp = timestamp;
        }
        updated
    }
}

fn failure_text(detail: &str) -> String {
    format!("Sorry, I couldn't analyze that message: {}", detail)
}

fn check_content(
    sender: Sender,
    sentiment: Option<Sentiment>,
    confidence: Option<f64>,
    error: Option<&str>,
) -> ConversationResult<()> {
    if sender == Sender::User && (sentiment.is_some() || confidence.is_some() || error.is_some()) {
        return Err(ConversationError::validation(
            "sender",
            "user messages cannot carry a classification",
        ));
    }
    if error.is_some() && (sentiment.is_some() || confidence.is_some()) {
        return Err(ConversationError::validation(
            "error",
            "failed messages cannot carry a classification",
        ));
    }
    if let Some(c) = confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(ConversationError::validation(
                "confidence",
                "must be within 0.0-1.0",
            ));
        }
    }
    Ok(())
}
