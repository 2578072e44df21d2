pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod images;
pub mod models;
pub mod repository;
pub mod service;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use config::{Config, ImageStorage};
use constants::{API_NAME, FORM_FIELDS_BODY_ALLOWANCE, UPLOADS_ROUTE};
use handlers::{cars, contacts, health};
use state::AppState;

/// Assembles the HTTP routes: `/api/cars`, `/api/contacts`, `/health` and,
/// for the filesystem image store, `/uploads`.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let body_limit = state
        .catalog
        .image_policy()
        .body_limit(FORM_FIELDS_BODY_ALLOWANCE);

    let mut app = Router::new()
        .nest("/api/cars", cars::router().layer(DefaultBodyLimit::max(body_limit)))
        .nest("/api/contacts", contacts::router())
        .merge(health::router());

    if config.image_storage == ImageStorage::Filesystem {
        app = app.nest_service(UPLOADS_ROUTE, ServeDir::new(&config.upload_dir));
    }

    app.layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("{} Ignoring malformed CORS origin '{}'", API_NAME, origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}
