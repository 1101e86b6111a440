//! Decomposition error types

use thiserror::Error;

/// Errors that can occur while fetching a decomposition
#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidPayload(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse failure classification surfaced to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecomposeFailureKind {
    /// The request never produced a usable HTTP exchange (connection,
    /// timeout, TLS)
    Transport,
    /// The service answered, but not with a well-formed decomposition
    /// (non-2xx status, unparsable body, wrong payload shape)
    Format,
}

impl std::fmt::Display for DecomposeFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Format => write!(f, "format"),
        }
    }
}

impl DecomposeError {
    /// Classify this error for reporting
    pub fn kind(&self) -> DecomposeFailureKind {
        match self {
            DecomposeError::Network(_) => DecomposeFailureKind::Transport,
            DecomposeError::Api { .. } | DecomposeError::InvalidPayload(_) | DecomposeError::Config(_) => {
                DecomposeFailureKind::Format
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_are_format_failures() {
        let err = DecomposeError::Api {
            status: 500,
            message: "Server error".to_string(),
        };
        assert_eq!(err.kind(), DecomposeFailureKind::Format);
    }

    #[test]
    fn test_payload_errors_are_format_failures() {
        let err = DecomposeError::InvalidPayload("not a JSON array".to_string());
        assert_eq!(err.kind(), DecomposeFailureKind::Format);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(DecomposeFailureKind::Transport.to_string(), "transport");
        assert_eq!(DecomposeFailureKind::Format.to_string(), "format");
    }
}
