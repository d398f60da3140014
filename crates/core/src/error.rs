/// Result alias that carries the custom [`AvatarError`] type.
pub type Result<T> = std::result::Result<T, AvatarError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    /// Free-form failure raised by subsystems that only need to surface a
    /// readable message (bad clip sets, malformed payloads, poisoned locks).
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around HTTP client errors raised by the backend API seam.
    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

impl AvatarError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for AvatarError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for AvatarError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
