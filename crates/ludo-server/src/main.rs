//! Ludo multiplayer game server.

use ludo_core::BotDifficulty;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod protocol;
mod room;
mod server;

use server::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse address from env or use default
    let addr: SocketAddr = std::env::var("SERVER_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    let bot_difficulty: BotDifficulty = std::env::var("BOT_DIFFICULTY")
        .unwrap_or_else(|_| "medium".into())
        .parse()
        .map_err(anyhow::Error::msg)?;

    info!(?bot_difficulty, "Starting Ludo server...");

    let state = Arc::new(ServerState::new(bot_difficulty));

    server::run_server(addr, state).await
}
