use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured error handling on the `error` event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Per-action rate limit exceeded
    RateLimit,
    /// Malformed or unparsable client frame
    InvalidInput,
    /// Frame exceeded the configured size limit
    MessageTooLarge,
    /// Unexpected failure inside a message handler
    InternalError,
}

impl ErrorCode {
    /// Human-readable description suitable for client display.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RateLimit => "Rate limit exceeded. Slow down and try again shortly.",
            Self::InvalidInput => "The message could not be understood by the server.",
            Self::MessageTooLarge => "The message exceeds the maximum allowed size.",
            Self::InternalError => "Internal server error. Please try again.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::InvalidInput => write!(f, "INVALID_INPUT"),
            Self::MessageTooLarge => write!(f, "MESSAGE_TOO_LARGE"),
            Self::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::RateLimit).unwrap(),
            "\"RATE_LIMIT\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::MessageTooLarge).unwrap(),
            "\"MESSAGE_TOO_LARGE\""
        );
    }

    #[test]
    fn display_matches_wire_form() {
        for code in [
            ErrorCode::RateLimit,
            ErrorCode::InvalidInput,
            ErrorCode::MessageTooLarge,
            ErrorCode::InternalError,
        ] {
            let wire = serde_json::to_string(&code).unwrap();
            assert_eq!(wire.trim_matches('"'), code.to_string());
        }
    }
}
