//! Axum server setup and router configuration.

use crate::api;
use crate::state::AppState;
use axum::{Json, Router, response::IntoResponse, routing::get};
use loyal_core::processors::shutdown_requested;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .nest("/api/user", api::user::router())
        // Add state to all routes
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run the server until `true` is broadcast on `shutdown_rx`, then drain
/// in-flight requests.
pub async fn run_server(
    router: Router,
    addr: String,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown_requested(&mut shutdown_rx).await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_server_stops_on_shutdown_broadcast() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_server(
            Router::new(),
            "127.0.0.1:0".to_string(),
            shutdown_rx,
        ));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .expect("server kept running after shutdown")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_server_stops_when_shutdown_sender_is_dropped() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_server(
            Router::new(),
            "127.0.0.1:0".to_string(),
            shutdown_rx,
        ));

        drop(shutdown_tx);
        tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .expect("server kept running after shutdown")
            .unwrap()
            .unwrap();
    }
}
