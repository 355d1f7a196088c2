//! Router assembly and CORS.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use bienlai_core::AppError;

use crate::api_doc::ApiDoc;
use crate::error::HttpAppError;
use crate::handlers;
use crate::state::AppState;

/// Build the application router.
pub fn build_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    // The transport body limit sits above the validation ceiling so that an
    // oversized upload usually reaches the handler and gets the contract's
    // 400 there. Uploads beyond even the transport limit are cut off with a
    // plain 413, which the response map below rewrites into the same JSON
    // 400 the handler would have produced.
    let body_limit = state.max_upload_bytes * 2;
    let max_mb = state.max_upload_bytes / (1024 * 1024);

    Router::new()
        .route("/", put(handlers::upload::upload_receipt))
        .route("/health", get(handlers::health::health))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(map_response(move |response: Response| async move {
            normalize_payload_too_large(response, max_mb)
        }))
        .layer(setup_cors(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Rewrite a bare transport-level 413 into the error envelope every other
/// rejection uses, so clients see one shape regardless of how far the
/// oversized body got.
fn normalize_payload_too_large(response: Response, max_mb: usize) -> Response {
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }
    HttpAppError(AppError::PayloadTooLarge(format!(
        "Ảnh vượt quá giới hạn {} MB.",
        max_mb
    )))
    .into_response()
}

/// CORS for the browser client. Preflight OPTIONS requests are answered by
/// this layer; PUT is the only mutating method exposed.
fn setup_cors(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::PUT, Method::OPTIONS];

    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(methods)
            .allow_headers(Any)
    }
}
