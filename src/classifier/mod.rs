//! Client for the external sentiment-classification service.
//!
//! The service accepts `POST /analyze` with `{"text": "..."}` and answers with
//! `{"sentiment": "...", "confidence": 0.97}`, possibly JSON-encoded as a string
//! or wrapped in a gateway envelope. Every failure is normalized into a
//! [`ServiceError`](crate::error::ServiceError) whose
//! [`is_retryable`](crate::error::ServiceError::is_retryable) flag drives the
//! retry policy.

mod client;
mod types;


pub use client::SentimentClient;
pub use types::*;

use async_trait::async_trait;

use crate::error::ServiceResult;

/// One classification request per call, no retry, no conversation side effects.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a non-empty piece of text.
    async fn classify(&self, text: &str) -> ServiceResult<Classification>;
}
