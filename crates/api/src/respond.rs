//! Response mapping.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde_json::json;

use storegate_core::EngineError;
use storegate_engine::RenderedResponse;

/// Map an assembled fragment response onto the wire.
pub fn rendered_to_response(rendered: RenderedResponse) -> Response {
    match rendered {
        RenderedResponse::Page { status, html } => {
            (status_code(status), Html(html)).into_response()
        }
        RenderedResponse::Denied { status, body } => {
            (status_code(status), axum::Json(body)).into_response()
        }
    }
}

/// Map the pipeline's hard failures. These are the only errors `assemble`
/// surfaces; everything else degraded internally.
pub fn engine_error_to_response(err: EngineError) -> Response {
    let (status, code) = match &err {
        EngineError::CsrfGeneration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "csrf_unavailable"),
        EngineError::CaptureState(_) => (StatusCode::INTERNAL_SERVER_ERROR, "render_state"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };

    tracing::error!(error = %err, "fragment pipeline failed");

    (
        status,
        axum::Json(json!({
            "error": code,
            "message": "The request could not be completed.",
        })),
    )
        .into_response()
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
