//! Terminal front end: command-line arguments, REPL commands and rendering.
//!
//! The REPL slash commands stand in for the keyboard shortcuts of a graphical
//! client: `/clear` (modifier+k), `/export` (modifier+s). Input focus is
//! implicit in a terminal.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::conversation::{format_relative, ControllerStatus, Message};

/// Sentiment chat command-line interface.
#[derive(Parser, Debug)]
#[command(name = "sentiment-chat", version, about)]
pub struct Cli {
    /// Command to run; defaults to the interactive chat.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive conversation (default)
    Chat,

    /// Analyze one message and print the reply
    Send {
        /// Text to analyze
        text: String,
    },

    /// Re-analyze the user message behind a bot reply
    Retry {
        /// Id of the bot message to update
        id: u64,
    },

    /// Export the conversation as JSON
    Export {
        /// Directory to write into (defaults to EXPORT_DIR)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Reset the conversation to the greeting
    Clear {
        /// Confirm clearing without prompting
        #[arg(long)]
        yes: bool,
    },

    /// Print the stored conversation
    History,

    /// Rename the conversation
    Title {
        /// New title
        title: String,
    },
}

/// A line typed into the REPL.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Plain text to classify
    Submit(String),
    /// `/retry <id>`
    Retry(u64),
    /// `/export`
    Export,
    /// `/clear`
    Clear,
    /// `/history`
    History,
    /// `/title <text>`
    Title(String),
    /// `/help`
    Help,
    /// `/quit` or `/exit`
    Quit,
    /// Blank line
    Empty,
    /// Anything else starting with `/`
    Unknown(String),
}

impl ReplCommand {
    /// Interpret one input line.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        if !line.starts_with('/') {
            return ReplCommand::Submit(line.to_string());
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "/retry" => match rest.parse() {
                Ok(id) => ReplCommand::Retry(id),
                Err(_) => ReplCommand::Unknown(line.to_string()),
            },
            "/export" => ReplCommand::Export,
            "/clear" => ReplCommand::Clear,
            "/history" => ReplCommand::History,
            "/title" if !rest.is_empty() => ReplCommand::Title(rest.to_string()),
            "/help" => ReplCommand::Help,
            "/quit" | "/exit" => ReplCommand::Quit,
            _ => ReplCommand::Unknown(line.to_string()),
        }
    }
}

/// Help text for the REPL
pub const REPL_HELP: &str = "\
Type a message to analyze its sentiment.
  /retry <id>    re-analyze the message behind bot reply <id>
  /export        export the conversation as JSON
  /clear         reset the conversation (asks for confirmation)
  /history       show the conversation
  /title <text>  rename the conversation
  /quit          leave";

/// One-line rendering of a message.
pub fn render_message(message: &Message, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "[{}] {} ({}): {}",
        message.id,
        message.sender,
        format_relative(message.timestamp, now),
        message.text
    );

    if message.is_bot() {
        match message.display_confidence() {
            Some(confidence) => {
                line.push_str(&format!(" [{} {}]", message.display_sentiment(), confidence))
            }
            None if message.is_failed() => {
                line.push_str(&format!(" [{}, use /retry {}]", message.display_sentiment(), message.id))
            }
            // plain bot text, e.g. the greeting
            None => {}
        }
    }

    line
}

/// Status line shown while a request is in flight.
pub fn render_status(status: ControllerStatus) -> Option<String> {
    match status {
        ControllerStatus::Idle => None,
        ControllerStatus::Submitting(state) if state.attempt > 1 => Some(format!(
            "retrying... ({}/{})",
            state.attempt, state.max_attempts
        )),
        ControllerStatus::Submitting(_) => Some("analyzing...".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Sentiment;
    use crate::conversation::Sender;
    use crate::retry::RetryState;

    #[test]
    fn test_parse_plain_text_is_submit() {
        assert_eq!(
            ReplCommand::parse("  I love this!  "),
            ReplCommand::Submit("I love this!".to_string())
        );
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
    }

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(ReplCommand::parse("/retry 5"), ReplCommand::Retry(5));
        assert_eq!(ReplCommand::parse("/export"), ReplCommand::Export);
        assert_eq!(ReplCommand::parse("/clear"), ReplCommand::Clear);
        assert_eq!(ReplCommand::parse("/quit"), ReplCommand::Quit);
        assert_eq!(
            ReplCommand::parse("/title Monday notes"),
            ReplCommand::Title("Monday notes".to_string())
        );
        assert!(matches!(ReplCommand::parse("/retry x"), ReplCommand::Unknown(_)));
        assert!(matches!(ReplCommand::parse("/title"), ReplCommand::Unknown(_)));
        assert!(matches!(ReplCommand::parse("/dance"), ReplCommand::Unknown(_)));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["sentiment-chat", "send", "hello there"]);
        assert_eq!(
            cli.command,
            Some(Command::Send {
                text: "hello there".to_string()
            })
        );

        let cli = Cli::parse_from(["sentiment-chat", "clear", "--yes"]);
        assert_eq!(cli.command, Some(Command::Clear { yes: true }));

        let cli = Cli::parse_from(["sentiment-chat"]);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_render_classified_message() {
        let now = Utc::now();
        let message = Message {
            id: 3,
            text: "Sentiment: positive (97.0% confidence)".to_string(),
            sender: Sender::Bot,
            timestamp: now,
            sentiment: Some(Sentiment::Positive),
            confidence: Some(0.97),
            error: None,
        };
        assert_eq!(
            render_message(&message, now),
            "[3] bot (just now): Sentiment: positive (97.0% confidence) [positive 97.0%]"
        );
    }

    #[test]
    fn test_render_greeting_has_no_annotation() {
        let now = Utc::now();
        let message = Message {
            id: 1,
            text: "Hello!".to_string(),
            sender: Sender::Bot,
            timestamp: now,
            sentiment: None,
            confidence: None,
            error: None,
        };
        assert_eq!(render_message(&message, now), "[1] bot (just now): Hello!");
    }

    #[test]
    fn test_render_failed_message_suggests_retry() {
        let now = Utc::now();
        let message = Message {
            id: 4,
            text: "Sorry".to_string(),
            sender: Sender::Bot,
            timestamp: now,
            sentiment: None,
            confidence: None,
            error: Some("boom".to_string()),
        };
        assert!(render_message(&message, now).ends_with("[neutral, use /retry 4]"));
    }

    #[test]
    fn test_render_status() {
        assert_eq!(render_status(ControllerStatus::Idle), None);
        let retrying = ControllerStatus::Submitting(RetryState {
            attempt: 2,
            max_attempts: 3,
        });
        assert_eq!(render_status(retrying).as_deref(), Some("retrying... (2/3)"));
    }
}
