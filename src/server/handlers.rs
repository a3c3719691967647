use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::qa::prompt;
use crate::state::AppState;

/// Header set carried by every response, success or failure.
fn base_headers() -> [(HeaderName, &'static str); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
        (header::CONTENT_TYPE, "application/json"),
    ]
}

/// CORS preflight: 204, no body, no body processing.
pub async fn preflight() -> Response {
    (StatusCode::NO_CONTENT, base_headers(), ()).into_response()
}

/// Answers one question.
///
/// The body is taken raw so that malformed JSON maps to the fixed
/// `Invalid JSON payload` message instead of axum's rejection.
pub async fn ask(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid JSON payload"),
    };

    let question = match payload.get("question") {
        None | Some(Value::Null) => {
            return error_response(StatusCode::BAD_REQUEST, "No question was provided")
        }
        Some(Value::String(text)) => text.clone(),
        // The original pipeline stringified whatever it was handed.
        Some(other) => other.to_string(),
    };

    let prompt = prompt::format_question(&question);
    match state.qa.run(&prompt).await {
        Ok(answer) => (StatusCode::OK, base_headers(), Json(answer)).into_response(),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Chatbot operation failed: {}", err),
        ),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, base_headers(), Json(json!({ "error": message }))).into_response()
}
