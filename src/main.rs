#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use quiz_royale_server::config;
use quiz_royale_server::logging;
use quiz_royale_server::questions;
use quiz_royale_server::server::Replica;
use quiz_royale_server::store::{RedisStore, SharedStore};
use std::net::SocketAddr;
use std::sync::Arc;

/// Quiz Royale -- horizontally-scalable realtime trivia game server
#[derive(Parser, Debug)]
#[command(name = "quiz-royale-server")]
#[command(about = "A horizontally-scalable realtime trivia game server backed by Redis pub/sub")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json and the environment; defaults
    // otherwise.
    let cfg = Arc::new(config::load());

    // Handle --print-config: output the loaded configuration as JSON
    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config(&cfg);

    // Handle --validate-config: exit after validation
    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Shared store: {}", cfg.server.redis_url);
                println!("  Broadcast channel: {}", cfg.server.channel);
                println!("  Min players: {}", cfg.server.min_players);
                println!("  Single-replica mode: {}", cfg.server.single_replica);
                println!("  Questions file: {}", cfg.server.questions_file);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    // In normal operation, propagate validation errors
    validation_result?;

    // Initialize logging from config.
    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting Quiz Royale server");

    // Connect the shared store and load the question catalog.
    let store: Arc<dyn SharedStore> = Arc::new(RedisStore::connect(&cfg.server.redis_url).await?);
    let summary = questions::load_questions(&cfg.server.questions_file, store.as_ref()).await?;
    tracing::info!(
        normal = summary.normal,
        final_round = summary.final_round,
        file = %cfg.server.questions_file,
        "question catalog loaded"
    );

    let replica = Replica::new(Arc::clone(&cfg), store);
    tracing::info!(instance = %replica.instance_name, "replica identity assigned");

    // Development convenience only: a fleet member must never clear another
    // replica's election cells.
    if cfg.server.single_replica {
        replica.reset_election_state().await?;
    }

    // One subscription per replica fans every broadcast out to the
    // locally-joined clients.
    replica.spawn_bus_listener();

    let router = replica.router();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.server.cors_origins,
        "Server started - WebSocket: /ws, health: /health"
    );

    axum::serve(listener, router).await?;

    Ok(())
}
