use std::sync::Arc;

use futures::StreamExt;

use custom_reply::channels::{Channel, CliChannel};
use custom_reply::config::ReplyConfig;
use custom_reply::engine::{Reply, ReplyEngine};
use custom_reply::store::{DocumentStore, JsonFileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ReplyConfig::from_env();

    eprintln!("💬 Custom Reply v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Data: {}", config.data_dir.display());
    eprintln!("   HTTP timeout: {}s", config.http_timeout.as_secs());
    eprintln!(
        "   Admins: {}",
        if config.admins.iter().any(|a| a == "*") {
            "everyone".to_string()
        } else {
            config.admins.join(", ")
        }
    );
    eprintln!("   Type /help for commands, /quit to exit.\n");

    let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(config.data_dir.clone()));
    let channel = CliChannel::new(config.cli_sender.clone());
    let engine = ReplyEngine::load(config, store).await?;

    let mut messages = channel.start().await?;
    while let Some(msg) = messages.next().await {
        if let Reply::Text(reply) = engine.on_message(&msg).await {
            if let Err(e) = channel.respond(&msg, &reply).await {
                tracing::error!(channel = channel.name(), "Failed to send reply: {}", e);
            }
        } else {
            eprint!("> ");
        }
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}
