//! Axum router configuration with middleware.
//!
//! API routes live under `/api/v1/`; the browser page is served at `/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::response::Html;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// The single-page chat UI, embedded at compile time.
const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Sessions
        .route(
            "/sessions",
            get(handlers::session::list_sessions).post(handlers::session::new_session),
        )
        .route("/sessions/current", get(handlers::session::current_session))
        .route(
            "/sessions/{id}/activate",
            post(handlers::session::activate_session),
        )
        // Chat
        .route("/chat", post(handlers::chat::send_message));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/", get(index_page))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET / - The chat page.
async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
