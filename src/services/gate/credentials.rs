//! Basic-scheme credential parsing and verification.
//!
//! - `parse_basic` turns a raw `Authorization` value into a [`Credential`].
//! - [`CredentialVerifier`] decides whether a parsed credential is accepted.
//!   The gate only knows the trait; the built-in rule is a single static pair.
//! - [`Authenticator`] glues the two together and speaks [`GateError`].

use std::{fmt, sync::Arc};

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

use super::types::GateError;

const BASIC_SCHEME: &str = "basic";

// Standard alphabet, lenient like the JDK decoder the old gateway used:
// `=` padding optional, non-zero trailing bits in the last symbol ignored.
const BASIC_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("authorization scheme is not basic")]
    NotBasic,
    #[error("credential payload is not valid base64")]
    InvalidBase64,
    #[error("credential payload is not valid utf-8")]
    InvalidUtf8,
    #[error("credential payload has no ':' separator")]
    MissingSeparator,
}

/// Decoded `username:password` pair. Lives for one authentication check.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parse `Basic <base64(username:password)>`.
///
/// Only the scheme prefix is matched (case-insensitively); whatever follows it
/// is trimmed and decoded. The decoded text is split on the first `:`, so the
/// password may itself contain colons.
pub fn parse_basic(raw: &str) -> Result<Credential, CredentialError> {
    let scheme = raw.get(..BASIC_SCHEME.len()).ok_or(CredentialError::NotBasic)?;
    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return Err(CredentialError::NotBasic);
    }

    let encoded = raw[BASIC_SCHEME.len()..].trim();
    let decoded = BASIC_ENGINE
        .decode(encoded)
        .map_err(|_| CredentialError::InvalidBase64)?;
    let decoded = String::from_utf8(decoded).map_err(|_| CredentialError::InvalidUtf8)?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or(CredentialError::MissingSeparator)?;

    Ok(Credential {
        username: username.to_owned(),
        password: password.to_owned(),
    })
}

/// Pluggable acceptance rule for decoded credentials.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credential: &Credential) -> bool;
}

/// Accepts exactly one configured username/password pair.
#[derive(Clone)]
pub struct StaticCredentialVerifier {
    username: String,
    password: String,
}

impl StaticCredentialVerifier {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for StaticCredentialVerifier {
    fn default() -> Self {
        Self::new("admin", "admin")
    }
}

impl fmt::Debug for StaticCredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialVerifier")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl CredentialVerifier for StaticCredentialVerifier {
    fn verify(&self, credential: &Credential) -> bool {
        credential.username == self.username && credential.password == self.password
    }
}

/// First gate stage: is the caller holding valid credentials?
#[derive(Clone)]
pub struct Authenticator {
    verifier: Arc<dyn CredentialVerifier>,
}

impl Authenticator {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    pub fn check_authentication(&self, raw: Option<&str>) -> bool {
        self.authenticate(raw).is_ok()
    }

    pub fn authenticate(&self, raw: Option<&str>) -> Result<(), GateError> {
        let raw = raw.ok_or(GateError::MissingCredentialHeader)?;

        let credential = parse_basic(raw).map_err(|err| {
            tracing::debug!(error = %err, "malformed basic credential");
            GateError::MalformedCredential
        })?;

        if !self.verifier.verify(&credential) {
            return Err(GateError::InvalidCredentialValue);
        }

        Ok(())
    }
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new(Arc::new(StaticCredentialVerifier::default()))
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}
