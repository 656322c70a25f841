/// Convenience result type used across the relay.
pub type RelayResult<T> = Result<T, RelayError>;

/// Top-level error taxonomy used by relay APIs.
///
/// None of these are fatal to the relay: a failed operation leaves the relay usable and its
/// bookkeeping consistent.
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    /// Invalid caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A compositor frame carrying neither a single plane nor a render-pass list.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The outbound channel refused a message.
    #[error("transport error: {0}")]
    Transport(String),

    /// Errors when serializing or deserializing scripts and reports.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// Build a [`RelayError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`RelayError::MalformedFrame`] value.
    pub fn malformed_frame(msg: impl Into<String>) -> Self {
        Self::MalformedFrame(msg.into())
    }

    /// Build a [`RelayError::Transport`] value.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Build a [`RelayError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
