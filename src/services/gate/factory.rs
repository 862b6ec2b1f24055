/// Factory: build the `RequestGate` from application `Config` and the identity store.
use std::sync::Arc;

use crate::config::Config;
use crate::repos::IdentityLookup;
use crate::services::gate::{RequestGate, StaticCredentialVerifier};

pub fn build_request_gate(config: &Config, lookup: Arc<dyn IdentityLookup>) -> Arc<RequestGate> {
    let verifier = StaticCredentialVerifier::new(
        config.basic_username.clone(),
        config.basic_password.clone(),
    );

    Arc::new(RequestGate::with_capabilities(
        Arc::new(verifier),
        lookup,
        config.lookup_timeout,
        config.identity_headers,
    ))
}
