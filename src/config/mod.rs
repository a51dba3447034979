use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Greeting used to seed a new conversation
pub const DEFAULT_GREETING: &str =
    "Hello! Send me any text and I'll tell you whether it sounds positive, negative or neutral.";

/// Title used when none has been persisted
pub const DEFAULT_TITLE: &str = "Sentiment Analysis Chat";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Classification service endpoint
    pub service: ServiceConfig,
    /// SQLite settings
    pub database: DatabaseConfig,
    /// Log filter and format
    pub logging: LoggingConfig,
    /// Timeout and retry schedule
    pub request: RequestConfig,
    /// Title, greeting and export location
    pub conversation: ConversationConfig,
}

/// Classification service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL; `/analyze` is appended (`SENTIMENT_API_URL`)
    pub base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file path (`DATABASE_PATH`)
    pub path: PathBuf,
    /// Pool size (`DATABASE_MAX_CONNECTIONS`)
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (`LOG_LEVEL`)
    pub level: String,
    /// Output format (`LOG_FORMAT`)
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable
    Pretty,
    /// One JSON object per line
    Json,
}

/// HTTP request and retry configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout (`REQUEST_TIMEOUT_MS`)
    pub timeout_ms: u64,
    /// Attempts per classification, at least 1 (`MAX_ATTEMPTS`)
    pub max_attempts: u32,
    /// Linear backoff step (`RETRY_BACKOFF_MS`)
    pub retry_backoff_ms: u64,
}

/// Conversation defaults
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Title used until one is persisted (`CONVERSATION_TITLE`)
    pub title: String,
    /// Seed message text (`CONVERSATION_GREETING`)
    pub greeting: String,
    /// Where exports are written (`EXPORT_DIR`)
    pub export_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let service = ServiceConfig {
            base_url: env::var("SENTIMENT_API_URL").map_err(|_| AppError::Config {
                message: "SENTIMENT_API_URL is required".to_string(),
            })?,
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/conversation.db".to_string()),
            ),
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let defaults = RequestConfig::default();
        let request = RequestConfig {
            timeout_ms: parse_or("REQUEST_TIMEOUT_MS", defaults.timeout_ms),
            max_attempts: parse_or("MAX_ATTEMPTS", defaults.max_attempts).max(1),
            retry_backoff_ms: parse_or("RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
        };

        let conversation = ConversationConfig {
            title: env::var("CONVERSATION_TITLE").unwrap_or_else(|_| DEFAULT_TITLE.to_string()),
            greeting: env::var("CONVERSATION_GREETING")
                .unwrap_or_else(|_| DEFAULT_GREETING.to_string()),
            export_dir: PathBuf::from(env::var("EXPORT_DIR").unwrap_or_else(|_| ".".to_string())),
        };

        Ok(Config {
            service,
            database,
            logging,
            request,
            conversation,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10000,
            max_attempts: 3,
            retry_backoff_ms: 1000,
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            export_dir: PathBuf::from("."),
        }
    }
}
