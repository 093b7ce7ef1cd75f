//! HTTP error mapping for API handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use textflag_core::AppError;

/// [`AppError`] wrapper that renders as a JSON error response.
#[derive(Debug)]
pub struct HttpError(pub AppError);

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl HttpError {
    /// Status code this error maps to.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Format { .. } | AppError::Html(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Overlap { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            AppError::NotFound => json!({ "error": "Not found" }),
            AppError::Overlap { existing_id, .. } => json!({
                "error": self.0.to_string(),
                "existingId": existing_id,
            }),
            AppError::Format { row, .. } => json!({
                "error": self.0.to_string(),
                "row": row,
            }),
            AppError::BadRequest(msg) => json!({ "error": msg }),
            AppError::Html(_) => json!({ "error": self.0.to_string() }),
            AppError::StorageMessage(msg) => {
                tracing::error!("Storage error: {}", msg);
                json!({ "error": "Storage error" })
            }
            other => {
                tracing::error!("Internal error: {:?}", other);
                json!({ "error": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matrix() {
        let cases = [
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Format {
                    row: 2,
                    message: "bad".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Html("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Overlap {
                    start: 3,
                    end: 8,
                    existing_id: 1,
                    existing_start: 0,
                    existing_end: 5,
                },
                StatusCode::CONFLICT,
            ),
            (
                AppError::StorageMessage("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let response = HttpError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
