use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use log::{error, info};
use prometheus::Registry;

use crate::metrics;

/// Build the HTTP router serving the metrics scrape endpoint.
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/metrics", get(serve_metrics))
        .with_state(registry)
}

/// Serve `/metrics` until the shutdown future resolves.
///
/// A bind failure is fatal at startup; scrape handling afterwards is
/// fully decoupled from poll timing and only reads the registry.
pub async fn serve(
    address: &str,
    registry: Arc<Registry>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Listening on {address}");

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn serve_metrics(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    match metrics::gather(&registry) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                String::new(),
            )
        }
    }
}
