//! Random marker attached to admitted requests under the `secret` header.

use super::types::GateError;

pub const MARKER_LEN: usize = 10;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// Largest multiple of 62 that fits in a byte; bytes at or above it are
// discarded so every symbol is equally likely.
const ACCEPT_BELOW: u8 = (256 / ALPHABET.len() * ALPHABET.len()) as u8;

/// 10 alphanumeric characters from the OS CSPRNG.
pub fn generate_marker() -> Result<String, GateError> {
    let mut out = String::with_capacity(MARKER_LEN);
    let mut buf = [0u8; 32];

    while out.len() < MARKER_LEN {
        getrandom::fill(&mut buf).map_err(|err| {
            tracing::error!(error = %err, "getrandom failed");
            GateError::MarkerUnavailable
        })?;

        for b in buf.iter().copied().filter(|b| *b < ACCEPT_BELOW) {
            if out.len() == MARKER_LEN {
                break;
            }
            out.push(ALPHABET[(b as usize) % ALPHABET.len()] as char);
        }
    }

    Ok(out)
}
