/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 *   - gate: RequestGate (holds the identity lookup), upstream: forwarding client
 * - Cheap to Clone (Arc inside); no per-request state lives here
 */
use std::sync::Arc;

use crate::services::{gate::RequestGate, upstream::Upstream};

#[derive(Clone, Debug)]
pub struct AppState {
    pub gate: Arc<RequestGate>,
    pub upstream: Arc<Upstream>,
}

impl AppState {
    pub fn new(gate: Arc<RequestGate>, upstream: Arc<Upstream>) -> Self {
        Self { gate, upstream }
    }
}
