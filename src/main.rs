use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sentiment_chat::{
    classifier::SentimentClient,
    cli::{render_message, render_status, Cli, Command, ReplCommand, REPL_HELP},
    config::{Config, LogFormat},
    conversation::{write_export, ConversationController, ConversationStore, NewMessage},
    error::ConversationError,
    retry::{RetryConfig, RetryPolicy},
    storage::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore},
};

type Controller = ConversationController<SentimentClient>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Sentiment chat starting..."
    );

    // Storage problems degrade to an unsaved session
    let backend: Arc<dyn KeyValueStore> = match SqliteKeyValueStore::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            Arc::new(s)
        }
        Err(e) => {
            warn!(error = %e, "Database unavailable, conversation will not be saved");
            Arc::new(MemoryKeyValueStore::new())
        }
    };

    let greeting = config.conversation.greeting.clone();
    let mut store = ConversationStore::new(
        backend,
        config.conversation.title.clone(),
        NewMessage::bot(greeting.clone()),
    );
    store.load().await;

    let client = match SentimentClient::new(&config.service, &config.request) {
        Ok(c) => {
            info!(endpoint = %c.endpoint(), "Sentiment client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize sentiment client");
            return Err(e.into());
        }
    };

    let policy = RetryPolicy::new(client, RetryConfig::from(&config.request));
    let controller = ConversationController::new(store, policy, greeting);

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_repl(&controller, &config).await?,
        Command::Send { text } => {
            let outcome = with_status(&controller, controller.submit(&text)).await?;
            let now = Utc::now();
            println!("{}", render_message(&outcome.user, now));
            println!("{}", render_message(&outcome.bot, now));
        }
        Command::Retry { id } => {
            let updated = with_status(&controller, controller.retry(id)).await?;
            println!("{}", render_message(&updated, Utc::now()));
        }
        Command::Export { output } => {
            let dir = output.unwrap_or_else(|| config.conversation.export_dir.clone());
            export(&controller, &dir).await?;
        }
        Command::Clear { yes } => {
            let confirmed = yes || confirm("Clear the whole conversation? [y/N] ").await?;
            if confirmed {
                controller.clear_conversation(true).await?;
                println!("Conversation cleared.");
            }
        }
        Command::History => print_history(&controller).await,
        Command::Title { title } => {
            controller.rename(&title).await?;
            println!("Conversation renamed to \"{}\".", controller.title().await);
        }
    }

    info!("Sentiment chat shutdown complete");
    Ok(())
}

async fn run_repl(controller: &Controller, config: &Config) -> anyhow::Result<()> {
    println!("{}", controller.title().await);
    print_history(controller).await;
    println!("(type /help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt("> ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Submit(text) => {
                match with_status(controller, controller.submit(&text)).await {
                    Ok(outcome) => println!("{}", render_message(&outcome.bot, Utc::now())),
                    Err(e) => println!("{}", e),
                }
            }
            ReplCommand::Retry(id) => match with_status(controller, controller.retry(id)).await {
                Ok(updated) => println!("{}", render_message(&updated, Utc::now())),
                Err(e) => println!("{}", e),
            },
            ReplCommand::Export => {
                if let Err(e) = export(controller, &config.conversation.export_dir).await {
                    println!("Export failed: {}", e);
                }
            }
            ReplCommand::Clear => {
                prompt("Clear the whole conversation? [y/N] ").await?;
                let answer = lines.next_line().await?.unwrap_or_default();
                if is_yes(&answer) {
                    let seed = controller.clear_conversation(true).await?;
                    println!("{}", render_message(&seed, Utc::now()));
                }
            }
            ReplCommand::History => print_history(controller).await,
            ReplCommand::Title(title) => match controller.rename(&title).await {
                Ok(()) => println!("Conversation renamed to \"{}\".", title),
                Err(e) => println!("{}", e),
            },
            ReplCommand::Help => println!("{}", REPL_HELP),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(input) => println!("Unknown command: {} (try /help)", input),
        }
    }

    Ok(())
}

/// Drive `operation` while reporting retry progress on stderr.
async fn with_status<T>(
    controller: &Controller,
    operation: impl Future<Output = Result<T, ConversationError>>,
) -> Result<T, ConversationError> {
    tokio::pin!(operation);
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut shown: Option<String> = None;

    loop {
        tokio::select! {
            result = &mut operation => return result,
            _ = ticker.tick() => {
                let status = render_status(controller.status());
                if status != shown {
                    if let Some(line) = &status {
                        eprintln!("{}", line);
                    }
                    shown = status;
                }
            }
        }
    }
}

async fn export(controller: &Controller, dir: &std::path::Path) -> anyhow::Result<()> {
    let json = controller.export_conversation().await?;
    let path = write_export(dir, &json, Utc::now())?;
    info!(path = %path.display(), "Conversation exported");
    println!("Exported to {}", path.display());
    Ok(())
}

async fn print_history(controller: &Controller) {
    let now = Utc::now();
    for message in controller.messages().await {
        println!("{}", render_message(&message, now));
    }
}

async fn prompt(text: &str) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await
}

async fn confirm(question: &str) -> std::io::Result<bool> {
    prompt(question).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    Ok(is_yes(&lines.next_line().await?.unwrap_or_default()))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
