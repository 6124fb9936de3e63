//! Password digest per the UsernameToken Profile 1.1:
//! `base64(sha1(nonce + created + password))`

use base64::{engine::general_purpose::STANDARD, Engine};
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

use crate::error::WsSecurityError;

/// Compute the password digest a client should have sent.
///
/// The nonce is decoded from Base64 before hashing; `created` and `password`
/// are hashed as their UTF-8 bytes.
pub fn compute_digest(
    nonce_b64: &str,
    created: &str,
    password: &str,
) -> Result<String, WsSecurityError> {
    let nonce = STANDARD
        .decode(nonce_b64.trim())
        .map_err(|_| WsSecurityError::InvalidNonce)?;

    let mut sha = Sha1::new();
    sha.update(&nonce);
    sha.update(created.as_bytes());
    sha.update(password.as_bytes());

    Ok(STANDARD.encode(sha.finalize()))
}

/// Constant-time string comparison for digests and plaintext passwords
pub fn verify_digest(supplied: &str, expected: &str) -> bool {
    supplied.as_bytes().ct_eq(expected.as_bytes()).into()
}
