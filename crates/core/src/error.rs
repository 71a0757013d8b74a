//! # Error Taxonomy
//!
//! Every terminal failure of the solving pipeline maps to one variant
//! here. Display strings are the stable, user-facing messages; internal
//! detail stays inside the variants and only reaches logs.

use thiserror::Error;

/// Failure kinds surfaced by the solving pipeline
#[derive(Debug, Error)]
pub enum SolveError {
    /// Request rejected before any external call was attempted
    #[error("{0}")]
    InvalidInput(String),

    /// Missing provider credential; fatal to the request, not the process
    #[error("API configuration error")]
    Configuration(String),

    /// The completion call exceeded its deadline
    #[error("Request timeout - try a shorter question")]
    Timeout,

    /// Provider returned HTTP 429
    #[error("Rate limit exceeded - please wait")]
    RateLimited,

    /// Candidate was flagged by the provider safety filter
    #[error("Question flagged by safety filters")]
    SafetyBlocked,

    /// Provider returned no usable candidate text
    #[error("No response from AI")]
    EmptyCompletion,

    /// Any other transport or provider failure
    #[error("Error processing request")]
    Upstream(String),
}

impl SolveError {
    /// Short machine-readable kind tag, used in logs and API payloads
    pub fn kind(&self) -> &'static str {
        match self {
            SolveError::InvalidInput(_) => "invalid_input",
            SolveError::Configuration(_) => "configuration",
            SolveError::Timeout => "timeout",
            SolveError::RateLimited => "rate_limited",
            SolveError::SafetyBlocked => "safety_blocked",
            SolveError::EmptyCompletion => "empty_completion",
            SolveError::Upstream(_) => "upstream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_messages() {
        assert_eq!(
            SolveError::Timeout.to_string(),
            "Request timeout - try a shorter question"
        );
        assert_eq!(
            SolveError::RateLimited.to_string(),
            "Rate limit exceeded - please wait"
        );
        assert_eq!(SolveError::EmptyCompletion.to_string(), "No response from AI");
    }

    #[test]
    fn test_internal_detail_not_displayed() {
        let err = SolveError::Upstream("connection reset by peer".to_string());
        assert_eq!(err.to_string(), "Error processing request");

        let err = SolveError::Configuration("GEMINI_API_KEY not set".to_string());
        assert_eq!(err.to_string(), "API configuration error");
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(SolveError::Timeout.kind(), "timeout");
        assert_eq!(
            SolveError::InvalidInput("too short".into()).kind(),
            "invalid_input"
        );
    }
}
