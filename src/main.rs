use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use gridpilot::chat::buffer::ChatBuffer;
use gridpilot::chat::parser::{ClickParser, ParserBounds};
use gridpilot::chat::transport;
use gridpilot::config;
use gridpilot::engine::engine::PlayerEngine;
use gridpilot::llm::registry::ProviderRegistry;
use gridpilot::perception::grid;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config, exiting");
            std::process::exit(1);
        }
    };

    let registry = ProviderRegistry::from_config(&config);
    if registry.get_active().is_err() {
        tracing::error!(
            provider = %config.llm.active_provider,
            "active provider missing from [llm.providers], exiting"
        );
        std::process::exit(1);
    }

    // Chat pipeline: transport → parser → buffer. The buffer is the only
    // state shared between the ingest task and the player loop.
    let buffer = Arc::new(ChatBuffer::new());
    let (columns, rows) = grid::grid_dimensions(
        config.chat.frame_width,
        config.chat.frame_height,
        config.game.cell_size,
    );
    let parser = ClickParser::new(ParserBounds {
        width: config.chat.frame_width,
        height: config.chat.frame_height,
        grid_size: columns * rows,
    });
    let (chat_tx, chat_rx) = mpsc::channel(64);
    let _ingest = transport::spawn_ingest(buffer.clone(), parser, chat_rx);
    if config.chat.enabled {
        let _stdin = transport::spawn_stdin_transport(chat_tx);
        tracing::info!("chat suggestions enabled: 'click 42' or 'click (123, 456)'");
    } else {
        drop(chat_tx);
        tracing::info!("chat suggestions disabled");
    }

    // Cooperative shutdown: Ctrl-C flips the stop flag, the loop observes it
    // between sleeps.
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            let _ = stop_tx.send(true);
        }
    });

    let mut engine = match PlayerEngine::new(config, registry, buffer, stop_rx) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize player engine, exiting");
            std::process::exit(1);
        }
    };
    engine.run_loop().await;
}
