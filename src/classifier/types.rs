use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ServiceError, ServiceResult};

/// How many layers of string encoding or gateway envelope are unwrapped.
const MAX_PAYLOAD_DEPTH: usize = 4;

/// Sentiment label returned by the classification service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Favourable
    Positive,
    /// Unfavourable
    Negative,
    /// Neither, also the display default for failures
    Neutral,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Negative => write!(f, "negative"),
            Sentiment::Neutral => write!(f, "neutral"),
        }
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            _ => Err(format!("Unknown sentiment: {}", s)),
        }
    }
}

/// Request body for `POST /analyze`
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    /// Text to classify
    pub text: String,
}

impl AnalyzeRequest {
    /// Wrap `text` for sending.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A successful classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Returned label
    pub sentiment: Sentiment,
    /// Confidence score (0.0-1.0).
    pub confidence: f64,
}

impl Classification {
    /// Create a classification, clamping confidence into [0, 1].
    pub fn new(sentiment: Sentiment, confidence: f64) -> Self {
        Self {
            sentiment,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Short human-readable summary, e.g. `Sentiment: positive (97.0% confidence)`.
    pub fn summary(&self) -> String {
        format!(
            "Sentiment: {} ({} confidence)",
            self.sentiment,
            format_confidence(self.confidence)
        )
    }
}

/// Format a confidence in [0, 1] as a percentage with one decimal, e.g. `97.0%`.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

/// Parse a response payload into a classification.
///
/// Accepts a decoded object, a JSON string holding the object, and a gateway
/// envelope `{"statusCode": .., "body": ..}`. An envelope status >= 400 is
/// classified the same way an HTTP status would be.
pub fn parse_classification(payload: Value) -> ServiceResult<Classification> {
    let mut current = payload;

    for _ in 0..MAX_PAYLOAD_DEPTH {
        let next = match current {
            Value::String(raw) => {
                serde_json::from_str(&raw).map_err(|_| ServiceError::invalid_format())?
            }
            Value::Object(map) => {
                if map.contains_key("sentiment") {
                    return classification_from_object(&map);
                }
                unwrap_envelope(map)?
            }
            _ => return Err(ServiceError::invalid_format()),
        };
        current = next;
    }

    Err(ServiceError::invalid_format())
}

fn unwrap_envelope(mut map: Map<String, Value>) -> ServiceResult<Value> {
    if let Some(status) = map.get("statusCode").and_then(Value::as_u64) {
        if status >= 400 {
            let status = status.min(u16::MAX as u64) as u16;
            let message = map
                .get("body")
                .and_then(error_message_from_value)
                .unwrap_or_else(|| format!("Server error: {}", status));
            return Err(ServiceError::from_status(status, message));
        }
    }

    map.remove("body").ok_or_else(ServiceError::invalid_format)
}

fn classification_from_object(map: &Map<String, Value>) -> ServiceResult<Classification> {
    let sentiment = map
        .get("sentiment")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Sentiment>().ok())
        .ok_or_else(ServiceError::invalid_format)?;

    let confidence = map
        .get("confidence")
        .or_else(|| map.get("score"))
        .and_then(coerce_confidence)
        .ok_or_else(ServiceError::invalid_format)?;

    Ok(Classification::new(sentiment, confidence))
}

fn coerce_confidence(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    raw.is_finite().then_some(raw)
}

/// Extract the upstream error message from a raw error body.
///
/// Understands `{"error": "..."}`, `{"error": {"message": "..."}}`,
/// `{"message": "..."}` and the same shapes JSON-encoded as a string.
pub fn error_message_from_body(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => error_message_from_value(&value),
        Err(_) => {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
}

fn error_message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => error_message_from_body(raw),
        Value::Object(map) => match map.get("error") {
            Some(Value::String(message)) => Some(message.clone()),
            Some(Value::Object(inner)) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => map.get("message").and_then(Value::as_str).map(str::to_string),
        },
        _ => None,
    }
}
