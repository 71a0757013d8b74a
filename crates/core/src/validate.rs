//! # Request Validation
//!
//! Shape and bounds checks applied before any external call. Pure
//! functions, no side effects; first failure wins.

use crate::error::SolveError;
use crate::models::Subject;

/// Minimum question length in characters
pub const MIN_QUERY_CHARS: usize = 5;
/// Maximum question length in characters
pub const MAX_QUERY_CHARS: usize = 1500;

/// Validate an incoming submission.
///
/// Checks run in order: identity, query lower bound, query upper bound,
/// subject. Returns the normalized `Subject` on success.
pub fn validate(user_id: &str, query: &str, subject: &str) -> Result<Subject, SolveError> {
    if user_id.trim().is_empty() {
        return Err(SolveError::InvalidInput("User ID required".to_string()));
    }

    let len = query.chars().count();
    if len < MIN_QUERY_CHARS {
        return Err(SolveError::InvalidInput(format!(
            "Question too short (min {} chars)",
            MIN_QUERY_CHARS
        )));
    }
    if len > MAX_QUERY_CHARS {
        return Err(SolveError::InvalidInput(format!(
            "Question too long (max {} chars)",
            MAX_QUERY_CHARS
        )));
    }

    subject
        .parse::<Subject>()
        .map_err(|_| SolveError::InvalidInput("Invalid subject".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_in_bounds_query() {
        for subject in ["physics", "chemistry", "mathematics", "biology"] {
            let result = validate("user-1", "What is inertia?", subject);
            assert!(result.is_ok(), "subject {} should validate", subject);
        }
    }

    #[test]
    fn test_subject_case_insensitive() {
        assert_eq!(
            validate("user-1", "What is inertia?", "PHYSICS").unwrap(),
            Subject::Physics
        );
    }

    #[test]
    fn test_missing_user_id() {
        let err = validate("", "What is inertia?", "physics").unwrap_err();
        assert_eq!(err.to_string(), "User ID required");
    }

    #[test]
    fn test_query_too_short() {
        let err = validate("user-1", "Why?", "physics").unwrap_err();
        assert_eq!(err.to_string(), "Question too short (min 5 chars)");
    }

    #[test]
    fn test_query_at_bounds() {
        assert!(validate("user-1", "12345", "physics").is_ok());
        let max = "a".repeat(MAX_QUERY_CHARS);
        assert!(validate("user-1", &max, "physics").is_ok());
    }

    #[test]
    fn test_query_too_long() {
        let long = "a".repeat(MAX_QUERY_CHARS + 1);
        let err = validate("user-1", &long, "physics").unwrap_err();
        assert_eq!(err.to_string(), "Question too long (max 1500 chars)");
    }

    #[test]
    fn test_invalid_subject() {
        let err = validate("user-1", "What is inertia?", "geography").unwrap_err();
        assert_eq!(err.to_string(), "Invalid subject");
    }

    #[test]
    fn test_identity_checked_before_query() {
        // First failure wins: empty identity reported even with a bad query
        let err = validate("", "hi", "geography").unwrap_err();
        assert_eq!(err.to_string(), "User ID required");
    }
}
