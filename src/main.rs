use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offer_monitor::config::Config;
use offer_monitor::monitor::Monitor;
use offer_monitor::parser;
use offer_monitor::platform::telegram;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `classify` output stays clean JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,offer_monitor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let first = args.next();

    if first.as_deref() == Some("classify") {
        let text = args.collect::<Vec<_>>().join(" ");
        return classify_once(&text);
    }

    let config_path = first
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Target group: {}", config.telegram.target_group_id);
    info!("  Target topic: {:?}", config.telegram.target_topic_id);
    info!("  Notify user: {}", config.telegram.notify_user_id);
    info!("  Auto-reply: {}", config.auto_reply.enabled);
    info!("  Proximity window: {}", config.classifier.proximity_window);

    let bot = Bot::new(&config.telegram.bot_token);
    let monitor = Arc::new(Monitor::new(&config));

    info!("Monitor is starting...");
    telegram::run(monitor, bot).await?;

    Ok(())
}

/// Classify a single message and print the result as JSON.
fn classify_once(text: &str) -> Result<()> {
    match parser::classify(text) {
        Some(result) => {
            let json = serde_json::to_string_pretty(&result)
                .context("Failed to serialize classification result")?;
            println!("{}", json);
        }
        None => println!("no offer found"),
    }
    Ok(())
}
