//! ONVIF authentication configuration
//!
//! Credentials for the WS-Security gate in front of the SOAP services.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters used for generating random passwords
const PASSWORD_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default age limit for UsernameToken `Created` timestamps
pub const DEFAULT_MAX_TOKEN_AGE_SECS: u64 = 300;

/// `[auth]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    /// Username for ONVIF authentication (empty = no credentials)
    pub username: String,
    /// Password for ONVIF authentication
    pub password: String,
    /// Reject protected operations that arrive without a token
    pub required: bool,
    /// Maximum token age in seconds, 0 disables the check
    pub max_token_age_secs: u64,
    /// Accept `#PasswordText` tokens
    pub allow_password_text: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            required: false,
            max_token_age_secs: DEFAULT_MAX_TOKEN_AGE_SECS,
            allow_password_text: false,
        }
    }
}

impl AuthConfig {
    /// Create new ONVIF auth config with the given credentials
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            ..Self::default()
        }
    }

    /// Generate config with default username and random password
    pub fn generate_default() -> Self {
        Self {
            required: true,
            ..Self::new("onvif", &generate_random_password(16))
        }
    }

    /// Username and password, when both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((self.username.as_str(), self.password.as_str()))
        }
    }
}

/// Generate a random alphanumeric password of the given length
pub fn generate_random_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..PASSWORD_CHARS.len());
            PASSWORD_CHARS[idx] as char
        })
        .collect()
}
