use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or unparsable setting
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Durable storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Classification call failure
    #[error("Sentiment service error: {0}")]
    Service(#[from] ServiceError),

    /// Rejected conversation operation
    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    /// Unexpected state
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Durable key-value storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Pool could not be opened
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    /// Statement failed
    #[error("Query failed: {message}")]
    Query { message: String },

    /// Embedded migrations failed
    #[error("Migration failed: {message}")]
    Migration { message: String },

    /// Value could not be encoded or decoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Raw driver error
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Classification service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No response within the configured timeout
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// 5xx status
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    /// Non-5xx failure status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Payload missing or malformed
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// No response received at all
    #[error("Service unreachable: {message}")]
    Unreachable { message: String },

    /// Other transport or client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ServiceError {
    /// Whether the failure is transient and may succeed on another attempt.
    ///
    /// Timeouts, 5xx responses and connection failures are transient. Client
    /// errors, malformed payloads and client construction failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout { .. }
                | ServiceError::Server { .. }
                | ServiceError::Unreachable { .. }
        )
    }

    /// Human-readable message stored on a failed bot message.
    pub fn detail(&self) -> String {
        match self {
            ServiceError::Timeout { timeout_ms } => {
                format!("request timed out after {}ms", timeout_ms)
            }
            ServiceError::Server { message, .. }
            | ServiceError::Api { message, .. }
            | ServiceError::InvalidResponse { message }
            | ServiceError::Unreachable { message } => message.clone(),
            ServiceError::Http(e) => e.to_string(),
        }
    }

    /// Build the error for a non-success HTTP (or envelope) status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status >= 500 {
            ServiceError::Server { status, message }
        } else {
            ServiceError::Api { status, message }
        }
    }

    /// The payload was missing `sentiment`/`confidence` or could not be read.
    pub fn invalid_format() -> Self {
        ServiceError::InvalidResponse {
            message: "invalid response format".to_string(),
        }
    }
}

/// Conversation and controller errors
#[derive(Debug, Error)]
pub enum ConversationError {
    /// Input rejected before any change
    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    /// No retryable message with this id
    #[error("Message not found: {message_id}")]
    NotFound { message_id: u64 },

    /// Another operation is in flight
    #[error("A classification is already in flight")]
    Busy,

    /// Clear called without confirmation
    #[error("Clearing the conversation requires confirmation")]
    ConfirmationRequired,

    /// Export document could not be encoded
    #[error("Export failed: {0}")]
    Export(#[from] serde_json::Error),
}

impl ConversationError {
    pub(crate) fn validation(field: &str, reason: &str) -> Self {
        ConversationError::Validation {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for classification service calls
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for conversation operations
pub type ConversationResult<T> = Result<T, ConversationError>;
