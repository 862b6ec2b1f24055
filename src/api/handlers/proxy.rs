/*
 * Responsibility
 * - Catch-all handler behind the gate: forward the admitted request upstream
 * - Upstream failures map to 502 / 504 (never 401: the caller was admitted)
 */
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
};

use crate::{error::AppError, state::AppState};

pub async fn proxy(
    State(state): State<AppState>,
    req: Request<Body>,
) -> Result<Response, AppError> {
    state.upstream.forward(req).await.map_err(|err| {
        tracing::error!(error = %err, upstream = %state.upstream.base_url(), "upstream forward failed");
        AppError::from(err)
    })
}
