use std::io;

/// Errors returned while building a [`Logger`](crate::Logger) or emitting a record.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The builder was missing a required part or carried conflicting settings.
    ///
    /// No logger is produced when this is returned.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    /// The record could not be encoded as JSON.
    #[error("unable to encode log record")]
    Encode(#[from] serde_json::Error),

    /// The sink refused the record.
    #[error("unable to write log record")]
    Write(#[from] io::Error),
}

impl Error {
    /// Returns `true` if this is [`Error::InvalidConfig`].
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }
}
