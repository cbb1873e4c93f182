use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use log::warn;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::AppState;
use super::handlers::{health_check, parse_subtitle, translate_subtitles};

/// Build the CORS layer from the configured origins, `*` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o.trim() == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::ORIGIN])
}

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = &state.controller.config().server;
    let cors = cors_layer(&server.cors_origins);
    let body_limit = DefaultBodyLimit::max(server.max_upload_bytes);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/parse-subtitle", post(parse_subtitle))
        .route("/api/translate-subtitles", post(translate_subtitles))
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}
