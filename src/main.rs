//! Crosses - multiplayer noughts-and-crosses server.

use anyhow::Result;
use clap::Parser;
use crosses::cli::Cli;
use crosses::web;
use crosses::GameService;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let service = GameService::new();
    let app = web::router(service);

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    info!(host = %cli.host, port = cli.port, "server ready");
    axum::serve(listener, app).await?;

    Ok(())
}
