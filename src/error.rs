use thiserror::Error;

/// Failure surface of extraction and injection.
///
/// The input could not be decoded in the declared format. The underlying
/// parser message is carried verbatim; nothing is retried internally.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid XML: {message}")]
    InvalidXml { message: String },

    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("input is not valid UTF-8: {message}")]
    InvalidUtf8 { message: String },
}

impl ParseError {
    pub fn invalid_xml(message: impl Into<String>) -> Self {
        ParseError::InvalidXml {
            message: message.into(),
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ParseError::InvalidJson {
            message: message.into(),
        }
    }
}
