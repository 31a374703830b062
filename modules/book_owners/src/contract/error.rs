use thiserror::Error;

/// Errors that are safe to expose to other modules.
///
/// Each variant carries the text of the underlying failure unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookOwnersError {
    #[error("{message}")]
    Upstream { message: String },

    #[error("{message}")]
    Timeout { message: String },

    #[error("{message}")]
    InvalidPayload { message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl BookOwnersError {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
