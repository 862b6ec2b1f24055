//! Request gate middleware: run the RequestGate once per request, before any handler.
//!
//! - Allowed: the request continues with the `secret` marker set.
//! - Rejected: the response is a bare status (401 caller fault, 503/500 system fault).
//!
//! The reason is logged here and nowhere else; the caller never sees it.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Guard every route of `router` with the gate.
///
/// ```ignore
/// let guarded = middleware::gate::apply(proxy_routes, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, gate_middleware))
}

async fn gate_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    match state.gate.admit(req).await {
        Ok(req) => {
            tracing::info!(%method, %path, "request admitted");
            Ok(next.run(req).await)
        }
        Err(err) if err.is_caller_fault() => {
            tracing::warn!(%method, %path, code = err.code(), reason = %err, "request rejected");
            Err(err.into())
        }
        Err(err) => {
            tracing::error!(%method, %path, code = err.code(), reason = %err, "gate unavailable");
            Err(err.into())
        }
    }
}
