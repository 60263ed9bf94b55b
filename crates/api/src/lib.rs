mod auth;
mod error;
pub mod routes;

use std::future::Future;
use std::net::SocketAddr;

use axum::{http::Method, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use engine::AlarmScheduler;
use store::AlarmStore;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub store: AlarmStore,
    pub scheduler: AlarmScheduler,
    /// Bearer token required on `/api/*`.
    pub api_token: String,
}

/// Build the status router: `/healthz` is public, `/api/*` needs the token.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .merge(routes::api_router(state.clone()))
        .merge(routes::health_router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Serve the status API until `shutdown` resolves.
pub async fn serve<F>(state: AppState, port: u16, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "Status API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
