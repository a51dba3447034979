//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use sentiment_chat::config::{Config, LogFormat, DEFAULT_GREETING, DEFAULT_TITLE};
use serial_test::serial;
use std::env;

const TEST_URL: &str = "http://localhost:9999";

fn with_service_url() {
    env::set_var("SENTIMENT_API_URL", TEST_URL);
}

#[test]
#[serial]
fn test_config_requires_service_url() {
    env::remove_var("SENTIMENT_API_URL");

    let result = Config::from_env();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("SENTIMENT_API_URL is required"));
}

#[test]
#[serial]
fn test_config_from_env_defaults() {
    with_service_url();

    let config = Config::from_env().unwrap();
    assert_eq!(config.service.base_url, TEST_URL);
    assert_eq!(config.request.timeout_ms, 10000);
    assert_eq!(config.request.max_attempts, 3);
    assert_eq!(config.request.retry_backoff_ms, 1000);
    assert_eq!(config.conversation.title, DEFAULT_TITLE);
    assert_eq!(config.conversation.greeting, DEFAULT_GREETING);
}

#[test]
#[serial]
fn test_config_from_env_custom_database() {
    with_service_url();
    env::set_var("DATABASE_PATH", "/custom/chat.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "2");

    let config = Config::from_env().unwrap();
    assert_eq!(config.database.path.to_str().unwrap(), "/custom/chat.db");
    assert_eq!(config.database.max_connections, 2);

    env::remove_var("DATABASE_PATH");
    env::remove_var("DATABASE_MAX_CONNECTIONS");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    with_service_url();
    env::set_var("LOG_FORMAT", "JSON");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    env::remove_var("LOG_FORMAT");
}

#[test]
#[serial]
fn test_config_from_env_custom_request() {
    with_service_url();
    env::set_var("REQUEST_TIMEOUT_MS", "2500");
    env::set_var("MAX_ATTEMPTS", "5");
    env::set_var("RETRY_BACKOFF_MS", "200");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 2500);
    assert_eq!(config.request.max_attempts, 5);
    assert_eq!(config.request.retry_backoff_ms, 200);

    env::remove_var("REQUEST_TIMEOUT_MS");
    env::remove_var("MAX_ATTEMPTS");
    env::remove_var("RETRY_BACKOFF_MS");
}

#[test]
#[serial]
fn test_config_zero_attempts_clamped_to_one() {
    with_service_url();
    env::set_var("MAX_ATTEMPTS", "0");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.max_attempts, 1);

    env::remove_var("MAX_ATTEMPTS");
}

#[test]
#[serial]
fn test_config_invalid_number_uses_default() {
    with_service_url();
    env::set_var("REQUEST_TIMEOUT_MS", "soon");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 10000);

    env::remove_var("REQUEST_TIMEOUT_MS");
}

#[test]
#[serial]
fn test_config_from_env_conversation_overrides() {
    with_service_url();
    env::set_var("CONVERSATION_TITLE", "Mood board");
    env::set_var("CONVERSATION_GREETING", "Hi there");
    env::set_var("EXPORT_DIR", "/tmp/exports");

    let config = Config::from_env().unwrap();
    assert_eq!(config.conversation.title, "Mood board");
    assert_eq!(config.conversation.greeting, "Hi there");
    assert_eq!(config.conversation.export_dir.to_str().unwrap(), "/tmp/exports");

    env::remove_var("CONVERSATION_TITLE");
    env::remove_var("CONVERSATION_GREETING");
    env::remove_var("EXPORT_DIR");
}
