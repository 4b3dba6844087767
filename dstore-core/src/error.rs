use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("{0}")]
    Key(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns a stable error code for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MalformedKey(_) => "MALFORMED_KEY",
            Error::Key(_) => "KEY_ERROR",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::InvalidCursor(_) => "INVALID_CURSOR",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }

    /// Shorthand for the error raised when an operation needs an incomplete key.
    pub fn incomplete_key_required() -> Self {
        Error::Key("An incomplete key must be provided.".to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
