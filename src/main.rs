use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use remedia_backend::core::config::AppPaths;
use remedia_backend::core::logging;
use remedia_backend::server;
use remedia_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(&AppPaths::new());

    let state = AppState::initialize().await;

    let host = state.settings().host;
    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(0);
    let bind_addr = format!("{}:{}", host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    // Stdout handshake so the page shell can find the chosen port.
    println!("REMEDIA_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
