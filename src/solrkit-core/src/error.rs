/// Errors raised while building requests or decoding responses
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("The {parameter} parameter requires Solr {required} or later (server reports {actual})")]
    UnsupportedParameter {
        parameter: &'static str,
        required: &'static str,
        actual: String,
    },

    #[error("Failed to parse Solr response: {0}")]
    Parse(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Failed to encode update payload: {0}")]
    Encode(String),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
