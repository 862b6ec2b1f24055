/*
 * Responsibility
 * - Value types shared by the gate stages (decision, failure taxonomy, identity key)
 * - Status mapping lives here so every stage rejects the same way
 */
use std::str::FromStr;

use axum::http::StatusCode;
use thiserror::Error;

/// Why a request was not admitted.
///
/// The `Display` text is the operator-facing reason. It is logged, never sent
/// to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("No Authorization header")]
    MissingCredentialHeader,
    #[error("Invalid Authorization header")]
    MalformedCredential,
    #[error("Invalid Authorization header")]
    InvalidCredentialValue,
    #[error("No Authentication headers found: client-id and product-id are required")]
    MissingIdentityHeaders,
    #[error("Invalid Authorization headers: client-id or product-id")]
    UnknownCaller,
    #[error("identity store unavailable: {0}")]
    LookupUnavailable(String),
    #[error("marker generation failed")]
    MarkerUnavailable,
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::MissingCredentialHeader
            | GateError::MalformedCredential
            | GateError::InvalidCredentialValue
            | GateError::MissingIdentityHeaders
            | GateError::UnknownCaller => StatusCode::UNAUTHORIZED,
            GateError::LookupUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GateError::MarkerUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable, low-cardinality label for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            GateError::MissingCredentialHeader => "missing_credential_header",
            GateError::MalformedCredential => "malformed_credential",
            GateError::InvalidCredentialValue => "invalid_credential_value",
            GateError::MissingIdentityHeaders => "missing_identity_headers",
            GateError::UnknownCaller => "unknown_caller",
            GateError::LookupUnavailable(_) => "lookup_unavailable",
            GateError::MarkerUnavailable => "marker_unavailable",
        }
    }

    /// Caller fault (bad credentials / identity) as opposed to a system fault.
    pub fn is_caller_fault(&self) -> bool {
        self.status() == StatusCode::UNAUTHORIZED
    }
}

/// Outcome of evaluating one request. There is no third state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Both checks passed. Carries the marker to attach under `secret`.
    Allow { marker: String },
    Reject(GateError),
}

impl GateDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, GateDecision::Allow { .. })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GateDecision::Allow { .. } => StatusCode::OK,
            GateDecision::Reject(err) => err.status(),
        }
    }
}

/// `(client-id, product-id)` as read from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentityKey {
    pub client_id: String,
    pub product_id: String,
}

/// How strictly the identity headers are required.
///
/// The gateway this replaces only rejected when *both* headers were absent,
/// then used both values unconditionally. `RequireBoth` is the default and
/// rejects when either is absent; `RequireAny` reproduces the old behaviour,
/// in which case a missing value is looked up as an empty string and can
/// never match a stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityHeaderPolicy {
    #[default]
    RequireBoth,
    RequireAny,
}

impl FromStr for IdentityHeaderPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" | "strict" => Ok(Self::RequireBoth),
            "any" | "either" | "legacy" => Ok(Self::RequireAny),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_faults_are_401_and_infrastructure_is_not() {
        assert_eq!(
            GateError::MissingCredentialHeader.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(GateError::UnknownCaller.status(), StatusCode::UNAUTHORIZED);
        assert!(GateError::MalformedCredential.is_caller_fault());

        let down = GateError::LookupUnavailable("timeout".into());
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!down.is_caller_fault());
    }

    #[test]
    fn reasons_match_gateway_wording() {
        assert_eq!(
            GateError::MissingCredentialHeader.to_string(),
            "No Authorization header"
        );
        assert_eq!(
            GateError::InvalidCredentialValue.to_string(),
            "Invalid Authorization header"
        );
    }

    #[test]
    fn identity_header_policy_parses() {
        assert_eq!(
            "both".parse::<IdentityHeaderPolicy>(),
            Ok(IdentityHeaderPolicy::RequireBoth)
        );
        assert_eq!(
            " ANY ".parse::<IdentityHeaderPolicy>(),
            Ok(IdentityHeaderPolicy::RequireAny)
        );
        assert!("sometimes".parse::<IdentityHeaderPolicy>().is_err());
        assert_eq!(
            IdentityHeaderPolicy::default(),
            IdentityHeaderPolicy::RequireBoth
        );
    }
}
