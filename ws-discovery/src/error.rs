use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Malformed datagram: {0}")]
    Parse(#[from] onvif_soap::ParseError),

    #[error("Not a WS-Discovery {expected}: got {found}")]
    UnexpectedMessage {
        expected: &'static str,
        found: String,
    },

    #[error("Missing {0}")]
    MissingElement(&'static str),
}
