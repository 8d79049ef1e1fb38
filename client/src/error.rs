//! Error types for the ticket API client

use thiserror::Error;

/// Errors that can occur when talking to the ticket API
///
/// `Display` yields the display-ready message only, so callers can embed it
/// as in `"Failed to load tickets: {error}"`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a status outside 200..=299
    #[error("{message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Message from the error body, or one synthesized from the status
        message: String,
    },

    /// The request never produced a response
    #[error("{message}")]
    Network {
        /// Always starts with `Network error:`
        message: String,
    },

    /// A successful response carried a body that did not parse
    #[error("{message}")]
    Decode {
        /// Parser message
        message: String,
    },
}

impl ApiError {
    /// Build an HTTP error, falling back to `API Error: {status} {reason}`
    /// when the body offered no usable message
    #[must_use]
    pub fn http(status: u16, reason: Option<&str>, body_message: Option<String>) -> Self {
        let message = body_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| match reason {
                Some(reason) if !reason.is_empty() => format!("API Error: {status} {reason}"),
                _ => format!("API Error: {status}"),
            });

        Self::Http { status, message }
    }

    /// Build a network error from the transport failure
    #[must_use]
    pub fn network(cause: impl std::fmt::Display) -> Self {
        let cause = cause.to_string();
        let cause = if cause.is_empty() { "Unknown error".to_string() } else { cause };
        Self::Network {
            message: format!("Network error: {cause}"),
        }
    }

    /// Build a decode error
    #[must_use]
    pub fn decode(cause: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: format!("Invalid response body: {cause}"),
        }
    }

    /// The display-ready message (never empty)
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Http { message, .. } | Self::Network { message } | Self::Decode { message } => {
                message
            },
        }
    }

    /// HTTP status, absent for network and decode failures
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network { .. } | Self::Decode { .. } => None,
        }
    }
}
