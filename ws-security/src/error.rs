//! WS-Security error types

use thiserror::Error;

/// Reasons a UsernameToken is rejected
#[derive(Debug, Error)]
pub enum WsSecurityError {
    /// Authentication is required but the request carried no UsernameToken
    #[error("Missing UsernameToken")]
    MissingToken,

    /// Required element missing from UsernameToken
    #[error("Missing required element: {0}")]
    MissingElement(&'static str),

    /// Nonce value has invalid Base64 encoding
    #[error("Invalid nonce encoding")]
    InvalidNonce,

    /// Created timestamp is unparseable or too far in the future
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Request timestamp is too old
    #[error("Token expired (age: {age_secs}s, max: {max_secs}s)")]
    Expired { age_secs: u64, max_secs: u64 },

    /// Plaintext passwords are disabled by policy
    #[error("PasswordText tokens are not accepted")]
    PasswordTextNotAllowed,

    /// Username or password does not match
    #[error("Invalid credentials")]
    InvalidCredentials,
}
