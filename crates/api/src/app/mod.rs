//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store handle, repositories and token service
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: response envelope, list queries and cookie helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let store = services::open_store(&config.store).await?;
    let services = Arc::new(services::build_services(store, config).await?);
    Ok(router_with_services(services, config))
}

pub fn router_with_services(services: Arc<services::AppServices>, config: &AppConfig) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.tokens.validator(),
        sessions: services.sessions.clone(),
        customers: services.customers.clone(),
    };

    let api = routes::router(auth_state).layer(Extension(services));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.cors_origins)),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
