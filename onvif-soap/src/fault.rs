//! SOAP faults
//!
//! Every failure a handler or the dispatcher can report ends up as one of the
//! [`FaultKind`]s below. The writer renders them per envelope version.

use thiserror::Error;

use crate::envelope::SoapVersion;
use crate::error::ParseError;

/// Top-level fault code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    /// The request was at fault (`Client` / `Sender`)
    Client,
    /// The responder was at fault (`Server` / `Receiver`)
    Server,
}

impl FaultCode {
    /// Qualified code for the given envelope version, using the `s` prefix
    pub fn qname(self, version: SoapVersion) -> &'static str {
        match (self, version) {
            (FaultCode::Client, SoapVersion::Soap11) => "s:Client",
            (FaultCode::Server, SoapVersion::Soap11) => "s:Server",
            (FaultCode::Client, SoapVersion::Soap12) => "s:Sender",
            (FaultCode::Server, SoapVersion::Soap12) => "s:Receiver",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    MalformedRequest,
    UnknownAction,
    NotAuthorized,
    InvalidArgument,
    Internal,
}

impl FaultKind {
    pub fn code(self) -> FaultCode {
        match self {
            FaultKind::MalformedRequest | FaultKind::NotAuthorized | FaultKind::InvalidArgument => {
                FaultCode::Client
            }
            FaultKind::UnknownAction | FaultKind::Internal => FaultCode::Server,
        }
    }

    /// ONVIF error subcode (`ter:` namespace)
    pub fn subcode(self) -> Option<&'static str> {
        match self {
            FaultKind::MalformedRequest => Some("ter:WellFormed"),
            FaultKind::UnknownAction => Some("ter:ActionNotSupported"),
            FaultKind::NotAuthorized => Some("ter:NotAuthorized"),
            FaultKind::InvalidArgument => Some("ter:InvalidArgVal"),
            FaultKind::Internal => None,
        }
    }
}

/// A fault ready to be written as a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct SoapFault {
    pub kind: FaultKind,
    pub reason: String,
    /// Second-level subcode, e.g. `ter:NoProfile`
    pub detail: Option<&'static str>,
}

impl SoapFault {
    pub fn new(kind: FaultKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            detail: None,
        }
    }

    pub fn malformed_request(reason: impl Into<String>) -> Self {
        Self::new(FaultKind::MalformedRequest, reason)
    }

    pub fn action_not_supported(action: &str) -> Self {
        Self::new(
            FaultKind::UnknownAction,
            format!("Action not supported: {}", action),
        )
    }

    pub fn not_authorized(reason: impl Into<String>) -> Self {
        Self::new(FaultKind::NotAuthorized, reason)
    }

    pub fn invalid_arg(reason: impl Into<String>) -> Self {
        Self::new(FaultKind::InvalidArgument, reason)
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(FaultKind::Internal, reason)
    }

    pub fn with_detail(mut self, subcode: &'static str) -> Self {
        self.detail = Some(subcode);
        self
    }

    pub fn code(&self) -> FaultCode {
        self.kind.code()
    }
}

impl From<ParseError> for SoapFault {
    fn from(err: ParseError) -> Self {
        SoapFault::malformed_request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_codes() {
        assert_eq!(SoapFault::malformed_request("x").code(), FaultCode::Client);
        assert_eq!(SoapFault::not_authorized("x").code(), FaultCode::Client);
        assert_eq!(SoapFault::invalid_arg("x").code(), FaultCode::Client);
        assert_eq!(SoapFault::action_not_supported("Foo").code(), FaultCode::Server);
        assert_eq!(SoapFault::internal("x").code(), FaultCode::Server);

        assert_eq!(FaultCode::Client.qname(SoapVersion::Soap12), "s:Sender");
        assert_eq!(FaultCode::Server.qname(SoapVersion::Soap11), "s:Server");
    }

    #[test]
    fn test_action_not_supported_reason_names_action() {
        let fault = SoapFault::action_not_supported("GetFoo");
        assert!(fault.reason.contains("GetFoo"));
        assert_eq!(fault.kind.subcode(), Some("ter:ActionNotSupported"));
    }

    #[test]
    fn test_from_parse_error() {
        let fault: SoapFault = ParseError::MissingBody.into();
        assert_eq!(fault.kind, FaultKind::MalformedRequest);
        assert_eq!(fault.reason, "Envelope has no Body");
    }
}
