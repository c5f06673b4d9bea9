//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The panel talks to this service over a small JSON API: list and search
//! the catalog, re-import the manifest, place a template, export the board.
//! Thumbnails are served from their own directory and everything else falls
//! through to the static panel assets.

pub mod export;
pub mod templates;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::{ErrorCode, error_body};
use crate::state::AppState;

/// JSON API routes.
fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/templates", get(templates::list_templates))
        .route("/api/templates/suggestions", get(templates::suggestions))
        .route("/api/templates/import", post(templates::import))
        .route("/api/templates/{phase}/{index}/place", post(templates::place))
        .route("/api/export", get(export::export_board))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

/// Full application: API, thumbnails and static panel assets.
pub fn app(state: AppState) -> Router {
    let thumbnails = ServeDir::new(&state.config.thumbnails_dir);
    let public = ServeDir::new(&state.config.public_dir).append_index_html_on_directories(true);

    api_routes(state)
        .nest_service("/thumbnails", thumbnails)
        .fallback_service(public)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error response with a `{code, message, retryable}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    pub fn from_error<E: ErrorCode>(err: E) -> Self {
        Self { status: status_for(err.error_code()), body: error_body(&err) }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.body.get("code").and_then(serde_json::Value::as_str)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// HTTP status for an error code.
fn status_for(code: &str) -> StatusCode {
    match code {
        "E_TEMPLATE_NOT_FOUND" | "E_ITEM_NOT_FOUND" => StatusCode::NOT_FOUND,
        "E_INVALID_SESSION" => StatusCode::BAD_REQUEST,
        "E_TEMPLATE_INVALID" | "E_TEMPLATE_EMPTY" | "E_MANIFEST_PARSE" | "E_MANIFEST_SHAPE" => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        "E_MANIFEST_FETCH" | "E_MANIFEST_STATUS" | "E_HOST_REQUEST" | "E_HOST_RESPONSE" | "E_HOST_PARSE"
        | "E_HOST_REJECTED" | "E_ITEM_UNSUPPORTED" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
