use axum::http::{header, Method};
use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{self, AppState};
use crate::system;

/// Конфигурация всех роутов приложения
pub fn configure_routes(state: AppState) -> Router {
    // Фронтенд (trunk serve) работает на другом порту
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        // Logs handlers
        .route(
            "/api/logs",
            get(handlers::logs::list_all)
                .post(handlers::logs::create)
                .delete(handlers::logs::clear_all),
        )
        .with_state(state)
        .layer(middleware::from_fn(system::middleware::request_logger))
        .layer(cors)
}
