/*
 * Responsibility
 * - middleware public surface
 * - gate: per-request allow/reject; http: request id, tracing, limits
 */
pub mod gate;
pub mod http;
