//! Hard to Get - Unified CLI
//!
//! Game server with multiple modes of operation.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use hard_to_get::{
    AppState, BroadcastNotifier, GameEngine, GameRepository, GameServer, ServerConfig, router,
};
use rmcp::ServiceExt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,hard_to_get=debug";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Server => run_mcp_server(cli.config.as_deref()).await,
        Command::Http {
            port,
            host,
            db_path,
        } => run_http_server(cli.config.as_deref(), host, port, db_path).await,
        Command::Stats { db_path, model } => run_stats(db_path, model),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[instrument]
fn load_config(path: Option<&Path>) -> Result<ServerConfig> {
    let config = match path {
        Some(path) => ServerConfig::from_file(path)?,
        None => {
            info!("No config file given, using defaults");
            ServerConfig::default()
        }
    };
    Ok(config)
}

#[instrument(skip(config, notifier))]
fn build_engine(
    config: &ServerConfig,
    notifier: Arc<BroadcastNotifier>,
) -> Result<Arc<GameEngine>> {
    let engine = GameEngine::new(
        config.corpus()?,
        config.rules(),
        config.random_source(),
        notifier,
        config.recorder()?,
    )?;
    Ok(Arc::new(engine))
}

/// Run the MCP game server (stdio mode)
async fn run_mcp_server(config_path: Option<&Path>) -> Result<()> {
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Hard to Get MCP server");

    let config = load_config(config_path)?;
    let notifier = Arc::new(BroadcastNotifier::new(*config.event_buffer()));
    let server = GameServer::new(build_engine(&config, notifier)?);

    info!("Server ready - connect via MCP protocol");
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

/// Run the HTTP game server
async fn run_http_server(
    config_path: Option<&Path>,
    host: String,
    port: u16,
    db_path: Option<String>,
) -> Result<()> {
    use axum::{body::Body, http::Request};
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager,
        tower::{StreamableHttpServerConfig, StreamableHttpService},
    };
    use tower::ServiceBuilder;
    use tracing::{debug, warn};

    tracing_subscriber::fmt().with_env_filter(env_filter()).init();

    info!("Starting Hard to Get HTTP server");

    let config = load_config(config_path)?.with_db_path(db_path);
    let notifier = Arc::new(BroadcastNotifier::new(*config.event_buffer()));
    let engine = build_engine(&config, Arc::clone(&notifier))?;

    let session_manager = Arc::new(LocalSessionManager::default());
    let mcp_config = StreamableHttpServerConfig::default();
    debug!(?mcp_config, "MCP service configuration");

    // Every MCP connection shares the one engine
    let mcp_engine = Arc::clone(&engine);
    let mcp_service = StreamableHttpService::new(
        move || {
            debug!("Creating GameServer for MCP connection");
            Ok(GameServer::new(Arc::clone(&mcp_engine)))
        },
        session_manager,
        mcp_config,
    );

    // REST and SSE routes first, MCP for everything else
    let app = router(AppState::new(engine, notifier)).fallback_service(
        ServiceBuilder::new()
            .map_request(|req: Request<Body>| {
                debug!(method = %req.method(), uri = %req.uri(), "Incoming MCP request");
                req
            })
            .service(tower::service_fn(move |req: Request<Body>| {
                let mut service = mcp_service.clone();
                async move {
                    let uri = req.uri().clone();
                    let result = tower::Service::call(&mut service, req).await;
                    match &result {
                        Ok(resp) => {
                            debug!(status = ?resp.status(), uri = %uri, "MCP response sent")
                        }
                        Err(e) => warn!(error = ?e, uri = %uri, "MCP request failed"),
                    }
                    result
                }
            })),
    );

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!(host = %host, port, "Server ready at http://{}:{}/", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Print a model's aggregated record
fn run_stats(db_path: String, model: String) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();

    let repository = GameRepository::new(db_path)?;
    repository.run_migrations()?;
    let stats = repository.model_stats(&model)?;

    println!("Model: {}", stats.model_name());
    println!(
        "  Detective: {} games, {} wins ({:.1}%)",
        stats.detective_games(),
        stats.detective_wins(),
        stats.detective_win_rate()
    );
    println!(
        "  Witness:   {} games, {} wins ({:.1}%)",
        stats.witness_games(),
        stats.witness_wins(),
        stats.witness_win_rate()
    );
    Ok(())
}
