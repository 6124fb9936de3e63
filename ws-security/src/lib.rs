//! WS-Security UsernameToken authentication
//!
//! Implements the OASIS WS-Security UsernameToken Profile 1.1 checks behind the
//! ONVIF dispatcher's authentication gate. Tokens are extracted by the SOAP
//! codec; this crate decides whether one is acceptable.
//!
//! # Example
//!
//! ```rust,ignore
//! use ws_security::{Authenticator, Credentials};
//!
//! let auth = Authenticator::new(Credentials {
//!     username: "admin".to_string(),
//!     password: "secret".to_string(),
//! })
//! .required(true);
//!
//! match auth.validate(&token) {
//!     Ok(()) => println!("Authenticated!"),
//!     Err(e) => println!("Auth failed: {}", e),
//! }
//! ```

mod digest;
mod error;
mod token;

pub use digest::{compute_digest, verify_digest};
pub use error::WsSecurityError;
pub use token::{PasswordType, UsernameToken};

use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::Duration;

/// Default maximum age of a token's `Created` timestamp (5 minutes)
pub const DEFAULT_MAX_TOKEN_AGE: Duration = Duration::from_secs(300);

/// Tolerated clock skew for tokens created in the future
const MAX_FUTURE_SKEW_SECS: i64 = 30;

/// Credentials for validating WS-Security tokens
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Authentication policy applied by the dispatcher
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: Credentials,
    required: bool,
    max_age: Option<Duration>,
    allow_password_text: bool,
}

impl Authenticator {
    /// Verify tokens against `credentials`. Tokens are optional until
    /// [`Authenticator::required`] is set.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            required: false,
            max_age: Some(DEFAULT_MAX_TOKEN_AGE),
            allow_password_text: false,
        }
    }

    /// Reject protected operations that arrive without a token
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Maximum token age; `None` disables the freshness check
    pub fn max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Accept `#PasswordText` tokens
    pub fn allow_password_text(mut self, allow: bool) -> Self {
        self.allow_password_text = allow;
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Validate a token against the configured credentials at the current time
    pub fn validate(&self, token: &UsernameToken) -> Result<(), WsSecurityError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as if the current time were `now`
    ///
    /// Checks, in order:
    /// 1. Username and password are present and the username matches
    /// 2. `Created` is neither stale nor too far in the future
    /// 3. The digest (or plaintext password, if allowed) matches
    pub fn validate_at(
        &self,
        token: &UsernameToken,
        now: DateTime<Utc>,
    ) -> Result<(), WsSecurityError> {
        if token.username.is_empty() {
            return Err(WsSecurityError::MissingElement("Username"));
        }
        if token.password.is_empty() {
            return Err(WsSecurityError::MissingElement("Password"));
        }
        if !verify_digest(&token.username, &self.credentials.username) {
            return Err(WsSecurityError::InvalidCredentials);
        }

        if let Some(created) = token.created.as_deref() {
            self.check_freshness(created, now)?;
        }

        match token.password_type {
            PasswordType::Digest => {
                let nonce = token
                    .nonce
                    .as_deref()
                    .ok_or(WsSecurityError::MissingElement("Nonce"))?;
                let created = token
                    .created
                    .as_deref()
                    .ok_or(WsSecurityError::MissingElement("Created"))?;

                let expected = compute_digest(nonce, created, &self.credentials.password)?;
                if !verify_digest(&token.password, &expected) {
                    return Err(WsSecurityError::InvalidCredentials);
                }
            }
            PasswordType::Text => {
                if !self.allow_password_text {
                    return Err(WsSecurityError::PasswordTextNotAllowed);
                }
                if !verify_digest(&token.password, &self.credentials.password) {
                    return Err(WsSecurityError::InvalidCredentials);
                }
            }
        }

        Ok(())
    }

    fn check_freshness(&self, created: &str, now: DateTime<Utc>) -> Result<(), WsSecurityError> {
        let created = parse_created(created)?;
        let age = now.signed_duration_since(created).num_seconds();

        if age < -MAX_FUTURE_SKEW_SECS {
            return Err(WsSecurityError::InvalidTimestamp);
        }

        if let Some(max_age) = self.max_age {
            let age_secs = age.max(0) as u64;
            if age_secs > max_age.as_secs() {
                return Err(WsSecurityError::Expired {
                    age_secs,
                    max_secs: max_age.as_secs(),
                });
            }
        }

        Ok(())
    }
}

/// Parse a `wsu:Created` value. Some clients omit the zone designator; those
/// timestamps are taken as UTC.
fn parse_created(created: &str) -> Result<DateTime<Utc>, WsSecurityError> {
    let created = created.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(created) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(created, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| WsSecurityError::InvalidTimestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn authenticator() -> Authenticator {
        Authenticator::new(Credentials {
            username: "onvif_user".to_string(),
            password: "userPassword".to_string(),
        })
    }

    fn fresh_token(username: &str, password: &str, created: DateTime<Utc>) -> UsernameToken {
        let nonce_bytes: [u8; 16] = rand::random();
        let nonce = base64::engine::general_purpose::STANDARD.encode(nonce_bytes);
        let created = created.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let digest = compute_digest(&nonce, &created, password).expect("compute digest");
        UsernameToken::digest(username, &digest, &nonce, &created)
    }

    #[test]
    fn test_validate_success() {
        let token = fresh_token("onvif_user", "userPassword", Utc::now());
        assert!(authenticator().validate(&token).is_ok());
    }

    #[test]
    fn test_validate_wrong_password() {
        let token = fresh_token("onvif_user", "wrongPassword", Utc::now());
        let result = authenticator().validate(&token);
        assert!(matches!(result, Err(WsSecurityError::InvalidCredentials)));
    }

    #[test]
    fn test_validate_wrong_username() {
        let token = fresh_token("intruder", "userPassword", Utc::now());
        let result = authenticator().validate(&token);
        assert!(matches!(result, Err(WsSecurityError::InvalidCredentials)));
    }

    #[test]
    fn test_validate_expired() {
        let token = fresh_token(
            "onvif_user",
            "userPassword",
            Utc::now() - chrono::Duration::seconds(600),
        );
        let result = authenticator().validate(&token);
        assert!(matches!(result, Err(WsSecurityError::Expired { .. })));

        // Freshness check can be switched off for clients with bad clocks
        assert!(authenticator().max_age(None).validate(&token).is_ok());
    }

    #[test]
    fn test_validate_future_timestamp() {
        let token = fresh_token(
            "onvif_user",
            "userPassword",
            Utc::now() + chrono::Duration::seconds(120),
        );
        let result = authenticator().validate(&token);
        assert!(matches!(result, Err(WsSecurityError::InvalidTimestamp)));
    }

    #[test]
    fn test_validate_digest_without_nonce() {
        let mut token = fresh_token("onvif_user", "userPassword", Utc::now());
        token.nonce = None;
        let result = authenticator().validate(&token);
        assert!(matches!(result, Err(WsSecurityError::MissingElement("Nonce"))));
    }

    #[test]
    fn test_password_text_policy() {
        let token = UsernameToken {
            username: "onvif_user".to_string(),
            password: "userPassword".to_string(),
            password_type: PasswordType::Text,
            nonce: None,
            created: None,
        };

        let result = authenticator().validate(&token);
        assert!(matches!(result, Err(WsSecurityError::PasswordTextNotAllowed)));

        let permissive = authenticator().allow_password_text(true);
        assert!(permissive.validate(&token).is_ok());

        let wrong = UsernameToken {
            password: "nope".to_string(),
            ..token
        };
        assert!(matches!(
            permissive.validate(&wrong),
            Err(WsSecurityError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_known_vector_at_fixed_time() {
        let auth = Authenticator::new(Credentials {
            username: "user".to_string(),
            password: "userpassword".to_string(),
        });
        let token = UsernameToken::digest(
            "user",
            "tuOSpGlFlIXsozq4HFNeeGeFLEI=",
            "LKqI6G/AikKCQrN0zqZFlg==",
            "2010-09-16T07:50:45Z",
        );
        let now = parse_created("2010-09-16T07:51:00Z").unwrap();
        assert!(auth.validate_at(&token, now).is_ok());
    }

    #[test]
    fn test_parse_created_without_zone() {
        let ts = parse_created("2024-03-01T12:00:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T12:00:00+00:00");
        assert!(parse_created("yesterday").is_err());
    }
}
