use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{error_message_from_body, parse_classification, AnalyzeRequest, Classification};
use super::Classifier;
use crate::config::{RequestConfig, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};

/// HTTP client for the sentiment `/analyze` endpoint
#[derive(Clone)]
pub struct SentimentClient {
    client: Client,
    endpoint: String,
    timeout_ms: u64,
}

impl SentimentClient {
    /// Create a new client with a fixed per-request timeout
    pub fn new(config: &ServiceConfig, request_config: &RequestConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ServiceError::Http)?;

        Ok(Self {
            client,
            endpoint: format!("{}/analyze", config.base_url.trim_end_matches('/')),
            timeout_ms: request_config.timeout_ms,
        })
    }

    /// Full URL of the analyze endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a single request (internal)
    async fn execute_request(&self, text: &str) -> ServiceResult<Classification> {
        debug!(chars = text.chars().count(), "Calling sentiment service");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&AnalyzeRequest::new(text))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = error_message_from_body(&body)
                .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
            return Err(ServiceError::from_status(status.as_u16(), message));
        }

        let payload: Value =
            serde_json::from_str(&body).map_err(|_| ServiceError::invalid_format())?;

        parse_classification(payload)
    }

    fn transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else if e.is_connect() || e.is_request() || e.is_body() {
            ServiceError::Unreachable {
                message: "no response received from server".to_string(),
            }
        } else {
            ServiceError::Http(e)
        }
    }
}

#[async_trait]
impl Classifier for SentimentClient {
    async fn classify(&self, text: &str) -> ServiceResult<Classification> {
        let start = Instant::now();

        match self.execute_request(text).await {
            Ok(classification) => {
                info!(
                    sentiment = %classification.sentiment,
                    confidence = classification.confidence,
                    latency_ms = start.elapsed().as_millis(),
                    "Sentiment classification succeeded"
                );
                Ok(classification)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    latency_ms = start.elapsed().as_millis(),
                    "Sentiment classification failed"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = ServiceConfig {
            base_url: "https://sentiment.example.com/prod/".to_string(),
        };

        let client = SentimentClient::new(&config, &RequestConfig::default());
        assert!(client.is_ok());
        assert_eq!(
            client.unwrap().endpoint(),
            "https://sentiment.example.com/prod/analyze"
        );
    }
}
