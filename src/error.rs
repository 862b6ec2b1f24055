/*
 * Responsibility
 * - The one HTTP-facing error type (AppError) and its IntoResponse
 * - Gate rejections go out as a bare status: no body, no reason
 * - Proxy / infrastructure failures get a small JSON body
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::gate::GateError;
use crate::services::upstream::UpstreamError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("rejected by gate: {0}")]
    Rejected(#[from] GateError),
    #[error("bad gateway")]
    BadGateway,
    #[error("gateway timeout")]
    GatewayTimeout,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Rejected(err) => return err.status().into_response(),
            AppError::BadGateway => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", "bad gateway"),
            AppError::GatewayTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "GATEWAY_TIMEOUT",
                "gateway timeout",
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "payload too large",
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error",
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: message.into(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<UpstreamError> for AppError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Timeout => AppError::GatewayTimeout,
            // to_bytes only fails on the length limit or a broken client stream
            UpstreamError::Body(_) => AppError::PayloadTooLarge,
            UpstreamError::Transport(_) | UpstreamError::ResponseTooLarge { .. } => {
                AppError::BadGateway
            }
            UpstreamError::Build(_) => AppError::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn gate_rejection_has_status_and_empty_body() {
        let resp = AppError::from(GateError::UnknownCaller).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(resp.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn lookup_outage_is_503() {
        let resp = AppError::from(GateError::LookupUnavailable("down".into())).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(resp.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn oversized_upstream_response_is_502() {
        let resp = AppError::from(UpstreamError::ResponseTooLarge { limit: 16 }).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn upstream_timeout_is_504() {
        let resp = AppError::from(UpstreamError::Timeout).into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
