/*
 * Responsibility
 * - URL layout of the gateway
 * - /health is open; every other path goes through the gate, then upstream
 */
use axum::{
    Router,
    routing::{any, get},
};

use crate::api::handlers::{health::health, proxy::proxy};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let guarded = Router::new()
        .route("/", any(proxy))
        .route("/{*path}", any(proxy));
    let guarded = middleware::gate::apply(guarded, state);

    Router::new().route("/health", get(health)).merge(guarded)
}
