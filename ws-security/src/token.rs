//! UsernameToken model
//!
//! The SOAP codec fills this in while walking the `Security` header; nothing in
//! this crate touches XML.

/// Password type URI suffix for digest passwords
const PASSWORD_DIGEST_SUFFIX: &str = "#PasswordDigest";

/// Password type URI suffix for plaintext passwords
const PASSWORD_TEXT_SUFFIX: &str = "#PasswordText";

/// How the `Password` element of a UsernameToken is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordType {
    /// `base64(sha1(nonce + created + password))`
    #[default]
    Digest,
    /// Plaintext password
    Text,
}

impl PasswordType {
    /// Classify the `Type` attribute of a `Password` element.
    ///
    /// A missing attribute means digest, which is what every ONVIF client sends.
    /// Unknown type URIs are also treated as digest so they fail verification
    /// instead of being compared as plaintext.
    pub fn from_type_uri(uri: Option<&str>) -> Self {
        match uri {
            Some(uri) if uri.ends_with(PASSWORD_TEXT_SUFFIX) => PasswordType::Text,
            Some(uri) if uri.ends_with(PASSWORD_DIGEST_SUFFIX) => PasswordType::Digest,
            _ => PasswordType::Digest,
        }
    }
}

/// UsernameToken carried in a SOAP `Security` header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsernameToken {
    pub username: String,
    /// Digest or plaintext, depending on `password_type`
    pub password: String,
    pub password_type: PasswordType,
    /// Base64-encoded nonce
    pub nonce: Option<String>,
    /// ISO 8601 creation timestamp
    pub created: Option<String>,
}

impl UsernameToken {
    /// Build a digest token from its parts
    pub fn digest(username: &str, digest: &str, nonce: &str, created: &str) -> Self {
        Self {
            username: username.to_string(),
            password: digest.to_string(),
            password_type: PasswordType::Digest,
            nonce: Some(nonce.to_string()),
            created: Some(created.to_string()),
        }
    }
}
