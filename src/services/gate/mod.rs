/*!
 * Request gate
 *
 * Responsibility:
 * - Decide, before any downstream handler runs, whether a request may pass
 * - Authentication (Basic credentials) strictly before authorization (caller identity)
 * - Allowed requests get a fresh `secret` marker header
 *
 * Public API:
 * - RequestGate, GateError, IdentityHeaderPolicy
 * - StaticCredentialVerifier (default rule behind credentials::CredentialVerifier)
 */

pub mod authorizer;
pub mod credentials;
pub mod factory;
pub mod marker;
pub mod request_gate;
pub mod types;

pub use credentials::StaticCredentialVerifier;
pub use factory::build_request_gate;
pub use request_gate::{MARKER_HEADER, RequestGate};
pub use types::{GateError, IdentityHeaderPolicy};
