use thiserror::Error;

/// Why an inbound envelope could not be parsed
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Request body is not valid UTF-8")]
    Encoding,

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Document is empty")]
    Empty,

    #[error("Root element is {0}, expected Envelope")]
    NotAnEnvelope(String),

    #[error("Unsupported envelope namespace: {0}")]
    UnknownEnvelopeNamespace(String),

    #[error("Multiple root elements")]
    MultipleRoots,

    #[error("Unclosed element: {0}")]
    Unclosed(String),

    #[error("Envelope has no Body")]
    MissingBody,

    #[error("Envelope has more than one Body")]
    DuplicateBody,

    #[error("Body has no action element")]
    EmptyBody,

    #[error("Body has more than one action element")]
    MultipleActions,
}
