//! Conversation export as a portable JSON document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::message::{Message, Sender};
use crate::classifier::Sentiment;

/// One exported message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Message id
    pub id: u64,
    /// Relative to export time, e.g. `5 minutes ago`.
    pub timestamp: String,
    /// Author
    pub sender: Sender,
    /// Displayed body
    pub text: String,
    /// Label, `null` when unclassified
    pub sentiment: Option<Sentiment>,
    /// Score, `null` when unclassified
    pub confidence: Option<f64>,
    /// Failure detail, omitted on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportRecord {
    fn from_message(message: &Message, now: DateTime<Utc>) -> Self {
        Self {
            id: message.id,
            timestamp: format_relative(message.timestamp, now),
            sender: message.sender,
            text: message.text.clone(),
            sentiment: message.sentiment,
            confidence: message.confidence,
            error: message.error.clone(),
        }
    }
}

/// One [`ExportRecord`] per message, timestamps relative to `now`.
pub fn export_records(messages: &[Message], now: DateTime<Utc>) -> Vec<ExportRecord> {
    messages
        .iter()
        .map(|m| ExportRecord::from_message(m, now))
        .collect()
}

/// Pretty-printed JSON array of [`ExportRecord`] in conversation order.
pub fn export_json(messages: &[Message], now: DateTime<Utc>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&export_records(messages, now))
}

/// `sentiment-conversation-<YYYY-MM-DD>.json`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("sentiment-conversation-{}.json", now.format("%Y-%m-%d"))
}

/// Write an export document into `dir` and return the file path.
pub fn write_export(dir: &Path, contents: &str, now: DateTime<Utc>) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(now));
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Human-relative age of `timestamp` as seen from `now`.
pub fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds();

    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return plural(minutes, "minute");
    }

    let hours = minutes / 60;
    if hours < 24 {
        return plural(hours, "hour");
    }

    let days = hours / 24;
    if days < 7 {
        return plural(days, "day");
    }

    timestamp.format("%Y-%m-%d %H:%M").to_string()
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}
