use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use askdocs::logging;
use askdocs::server;
use askdocs::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    // Fatal on missing API key or unreadable index: the process must never
    // serve a request with a half-built pipeline.
    let state = AppState::initialize().await?;

    // The Functions host hands custom handlers their port; default for
    // local runs.
    let port = env::var("FUNCTIONS_CUSTOMHANDLER_PORT")
        .or_else(|_| env::var("PORT"))
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(8080);
    let bind_addr = format!("127.0.0.1:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app: Router = server::router::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
