//! SOAP Envelope Codec
//!
//! Parses inbound SOAP 1.1/1.2 envelopes into a [`SoapMessage`] and writes
//! responses and faults back in the envelope version the request used.
//!
//! The dispatch key is the local name of the single child of `Body`, so the
//! prefixes a client picks (`tds:`, `ns0:`, none) never matter.
//!
//! ```rust,ignore
//! let msg = onvif_soap::parse(body)?;
//! assert_eq!(msg.action(), "GetDeviceInformation");
//! let xml = onvif_soap::wrap(msg.version, "<tds:GetDeviceInformationResponse/>");
//! ```

mod envelope;
mod error;
mod fault;
mod writer;

pub use envelope::{parse, Body, Header, Param, Params, SoapMessage, SoapVersion};
pub use error::ParseError;
pub use fault::{FaultCode, FaultKind, SoapFault};
pub use writer::{wrap, wrap_fault, xml_escape, EnvelopeBuilder};

/// XML namespaces used on the wire
pub mod ns {
    pub const SOAP11: &str = "http://schemas.xmlsoap.org/soap/envelope/";
    pub const SOAP12: &str = "http://www.w3.org/2003/05/soap-envelope";

    pub const TDS: &str = "http://www.onvif.org/ver10/device/wsdl";
    pub const TRT: &str = "http://www.onvif.org/ver10/media/wsdl";
    pub const TEV: &str = "http://www.onvif.org/ver10/events/wsdl";
    pub const TT: &str = "http://www.onvif.org/ver10/schema";
    pub const TER: &str = "http://www.onvif.org/ver10/error";
    pub const DN: &str = "http://www.onvif.org/ver10/network/wsdl";

    pub const WSNT: &str = "http://docs.oasis-open.org/wsn/b-2";
    pub const WSTOP: &str = "http://docs.oasis-open.org/wsn/t-1";
    pub const WSA: &str = "http://www.w3.org/2005/08/addressing";

    pub const WSSE: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
    pub const WSU: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";

    /// WS-Addressing as used by WS-Discovery (April 2005)
    pub const WSA_2004: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
    pub const WSD: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery";
}
