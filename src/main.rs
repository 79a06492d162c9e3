#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;

use clap::Parser;
use pairlink_server::config;
use pairlink_server::logging;
use pairlink_server::server::ServerConfig;
use pairlink_server::websocket;

/// Pairlink -- WebSocket pairing and signaling server for anonymous P2P video chat
#[derive(Parser, Debug)]
#[command(name = "pairlink-server")]
#[command(about = "An in-memory WebSocket pairing and signaling server for P2P video chat")]
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

    // Load configuration from config.json if present; otherwise use code defaults.
    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Idle timeout: {}s", cfg.server.idle_timeout);
                println!("  Search timeout: {}s", cfg.server.search_timeout);
                println!("  Matching interval: {}ms", cfg.server.matching_interval_ms);
                println!(
                    "  Rate limit sweep interval: {}s",
                    cfg.rate_limit.sweep_interval
                );
                println!("  Max message size: {} bytes", cfg.security.max_message_size);
                println!(
                    "  Max connections per IP: {}",
                    cfg.security.max_connections_per_ip
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result.map_err(|e| anyhow::anyhow!("invalid configuration:\n{e}"))?;

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let server_config = ServerConfig::from_config(&cfg);

    websocket::run_server(
        addr,
        server_config,
        cfg.protocol.clone(),
        cfg.security.cors_origins.clone(),
    )
    .await
}
