//! ask-relay server binary.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use ask_relay::config::{Cli, Config};
use ask_relay::server::routes::{build_router, AppState};
use ask_relay::upstream::client::ChatClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "ask_relay=debug,tower_http=debug"
    } else {
        "ask_relay=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("ask-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration. Refuses to start without the API credential.
    let config = Config::load(&cli.config)?;
    let config = Arc::new(config);

    info!(
        base_url = %config.upstream.base_url,
        model = %config.upstream.model,
        static_dir = %config.server.static_dir.display(),
        "Configuration loaded"
    );

    // Initialize the upstream chat client.
    let client = ChatClient::new(&config.upstream)?;

    // Build application state.
    let state = Arc::new(AppState {
        client,
        config: config.clone(),
        start_time: Instant::now(),
    });

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listen_addr = format!("0.0.0.0:{}", config.server.port);
    info!(addr = %listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
