use thiserror::Error;

/// Failures of the upstream owners fetch.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("upstream request failed: {message}")]
    UpstreamRequest { message: String },

    #[error("upstream request timed out: {message}")]
    UpstreamTimeout { message: String },

    #[error("malformed upstream payload: {message}")]
    MalformedPayload { message: String },

    #[error("invalid upstream base url '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },
}

impl DomainError {
    pub fn upstream_request(message: impl Into<String>) -> Self {
        Self::UpstreamRequest {
            message: message.into(),
        }
    }

    pub fn upstream_timeout(message: impl Into<String>) -> Self {
        Self::UpstreamTimeout {
            message: message.into(),
        }
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    pub fn invalid_base_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidBaseUrl {
            url: url.into(),
            message: message.into(),
        }
    }
}
