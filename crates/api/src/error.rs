//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use saldo_core::ledger::LedgerError;
use saldo_shared::AppError;
use serde_json::json;
use tracing::{error, warn};

/// Builds an error response with the `{"error", "message"}` body.
pub fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into()
        })),
    )
        .into_response()
}

/// Renders a ledger error with its mapped status.
///
/// Storage failures are logged and reported without their driver message.
pub fn ledger_error_response(err: LedgerError) -> Response {
    let code = err.error_code().to_ascii_lowercase();
    let message = err.public_message();
    let app = AppError::from(err);
    let status =
        StatusCode::from_u16(app.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match app {
        AppError::Database(_) | AppError::Internal(_) => {
            error!(error = %app, "Ledger operation failed");
        }
        AppError::Conflict(_) | AppError::Timeout(_) => {
            warn!(error = %app, "Ledger operation did not complete");
        }
        _ => {}
    }
    error_response(status, &code, message)
}

/// Renders a request that could not be parsed.
pub fn bad_request(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, "validation_error", message)
}
