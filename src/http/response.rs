//! Error responses.
//!
//! Every failure leaves the service as `{"error": {"code", "message"}}`.
//! Admission rejections map to 503, a queue wait that ran out to 504,
//! permanent upstream input errors to 400, other upstream failures to 502.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::{ErrorKind, GateError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("{0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthorized,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Gate(err) => match err {
                GateError::QueueFull { .. }
                | GateError::CircuitOpen
                | GateError::QueueCleared
                | GateError::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
                GateError::QueueTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                GateError::Operation {
                    kind: ErrorKind::BadRequest | ErrorKind::InvalidInput,
                    ..
                } => StatusCode::BAD_REQUEST,
                GateError::Operation { .. } => StatusCode::BAD_GATEWAY,
            },
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Gate(err) => err.code(),
            ApiError::Validation(_) => "validation_error",
            ApiError::Unauthorized => "unauthorized",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_admission_errors_are_unavailable() {
        for err in [
            GateError::QueueFull { max: 1 },
            GateError::CircuitOpen,
            GateError::QueueCleared,
            GateError::Shutdown,
        ] {
            assert_eq!(ApiError::from(err).status(), StatusCode::SERVICE_UNAVAILABLE);
        }
    }

    #[test]
    fn test_operation_errors() {
        let timeout = ApiError::from(GateError::QueueTimeout {
            waited: Duration::from_secs(1),
        });
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let bad = ApiError::from(GateError::with_kind(ErrorKind::BadRequest, "bad"));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let auth = ApiError::from(GateError::with_kind(ErrorKind::Unauthorized, "key"));
        assert_eq!(auth.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(auth.code(), "unauthorized");

        let transient = ApiError::from(GateError::operation("upstream 503"));
        assert_eq!(transient.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(transient.code(), "transient");
    }
}
