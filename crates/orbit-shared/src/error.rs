use thiserror::Error;

/// Inbound real-time frame could not be understood.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Frame is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A create request failed shape validation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field `{0}` must not be empty")]
    EmptyField(&'static str),
}
